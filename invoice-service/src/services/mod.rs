//! Services layer for invoice-service.
//!
//! Business logic over the store traits, plus the backends implementing them.

pub mod admin;
pub mod auth;
mod database;
pub mod error;
pub mod invoices;
mod jwt;
mod memory;
pub mod metrics;
pub mod numbering;
pub mod stats;
mod store;

pub use admin::AdminService;
pub use auth::AuthService;
pub use database::MongoDb;
pub use error::ServiceError;
pub use invoices::InvoiceService;
pub use jwt::JwtService;
pub use memory::MemoryStore;
pub use store::{InvoiceStore, Store, UserStore};
