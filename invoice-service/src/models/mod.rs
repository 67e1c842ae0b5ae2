pub mod invoice;
pub mod line_item;
pub mod user;

pub use invoice::{
    CreateInvoice, Invoice, InvoiceSort, InvoiceSortField, InvoiceStatus, ListInvoicesFilter,
    SortOrder, Totals, UpdateInvoice,
};
pub use line_item::LineItem;
pub use user::{normalize_email, Caller, OwnerSummary, User, UserResponse};
