//! Persistence seams for users and invoices.
//!
//! Handlers and services only see these traits; [`MongoDb`](super::MongoDb)
//! and [`MemoryStore`](super::MemoryStore) implement them.

use async_trait::async_trait;

use super::ServiceError;
use crate::models::{Invoice, ListInvoicesFilter, User};

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Persist a new invoice. Fails with `Conflict` if the invoice number is taken.
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), ServiceError>;

    async fn find_invoice(&self, id: &str) -> Result<Option<Invoice>, ServiceError>;

    /// Overwrite an existing invoice; returns `false` if it no longer exists.
    async fn replace_invoice(&self, invoice: &Invoice) -> Result<bool, ServiceError>;

    async fn delete_invoice(&self, id: &str) -> Result<bool, ServiceError>;

    /// Invoices matching the filter, in no particular order.
    async fn find_invoices(&self, filter: &ListInvoicesFilter)
        -> Result<Vec<Invoice>, ServiceError>;

    async fn count_invoices(&self, filter: &ListInvoicesFilter) -> Result<u64, ServiceError>;

    /// Remove every invoice owned by the user; returns how many were removed.
    async fn delete_invoices_by_owner(&self, owner_id: &str) -> Result<u64, ServiceError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new user. Fails with `Conflict` if the email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), ServiceError>;

    async fn find_user(&self, id: &str) -> Result<Option<User>, ServiceError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError>;

    /// Overwrite an existing user; returns `false` if it no longer exists.
    /// Fails with `Conflict` if the new email belongs to another user.
    async fn replace_user(&self, user: &User) -> Result<bool, ServiceError>;

    async fn delete_user(&self, id: &str) -> Result<bool, ServiceError>;

    async fn list_users(&self) -> Result<Vec<User>, ServiceError>;

    async fn find_users(&self, ids: &[String]) -> Result<Vec<User>, ServiceError>;
}

/// Everything the service needs from a backend.
#[async_trait]
pub trait Store: InvoiceStore + UserStore {
    async fn health_check(&self) -> Result<(), ServiceError>;
}
