//! In-process store used for development and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{InvoiceStore, ServiceError, Store, UserStore};
use crate::models::{Invoice, ListInvoicesFilter, User};

#[derive(Default)]
struct State {
    users: HashMap<String, User>,
    invoices: HashMap<String, Invoice>,
}

/// Same uniqueness rules as the MongoDB indexes: one user per email,
/// one invoice per invoice number.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, ServiceError> {
        self.state
            .lock()
            .map_err(|_| ServiceError::Internal(anyhow::anyhow!("memory store lock poisoned")))
    }
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), ServiceError> {
        let mut state = self.lock()?;
        if state
            .invoices
            .values()
            .any(|i| i.invoice_number == invoice.invoice_number)
        {
            return Err(ServiceError::Conflict(format!(
                "Invoice number {} already exists",
                invoice.invoice_number
            )));
        }
        state.invoices.insert(invoice.id.clone(), invoice.clone());
        Ok(())
    }

    async fn find_invoice(&self, id: &str) -> Result<Option<Invoice>, ServiceError> {
        Ok(self.lock()?.invoices.get(id).cloned())
    }

    async fn replace_invoice(&self, invoice: &Invoice) -> Result<bool, ServiceError> {
        let mut state = self.lock()?;
        match state.invoices.get_mut(&invoice.id) {
            Some(existing) => {
                *existing = invoice.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_invoice(&self, id: &str) -> Result<bool, ServiceError> {
        Ok(self.lock()?.invoices.remove(id).is_some())
    }

    async fn find_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, ServiceError> {
        Ok(self
            .lock()?
            .invoices
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect())
    }

    async fn count_invoices(&self, filter: &ListInvoicesFilter) -> Result<u64, ServiceError> {
        let count = self
            .lock()?
            .invoices
            .values()
            .filter(|i| filter.matches(i))
            .count();
        Ok(count as u64)
    }

    async fn delete_invoices_by_owner(&self, owner_id: &str) -> Result<u64, ServiceError> {
        let mut state = self.lock()?;
        let before = state.invoices.len();
        state.invoices.retain(|_, i| i.owner_id != owner_id);
        Ok((before - state.invoices.len()) as u64)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), ServiceError> {
        let mut state = self.lock()?;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(ServiceError::Conflict("User already exists".to_string()));
        }
        state.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, ServiceError> {
        Ok(self.lock()?.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn replace_user(&self, user: &User) -> Result<bool, ServiceError> {
        let mut state = self.lock()?;
        if state
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(ServiceError::Conflict("Email already in use".to_string()));
        }
        match state.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, id: &str) -> Result<bool, ServiceError> {
        Ok(self.lock()?.users.remove(id).is_some())
    }

    async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        Ok(self.lock()?.users.values().cloned().collect())
    }

    async fn find_users(&self, ids: &[String]) -> Result<Vec<User>, ServiceError> {
        let state = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), ServiceError> {
        self.lock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateInvoice, LineItem};
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn invoice(owner: &str, number: &str) -> Invoice {
        let input = CreateInvoice {
            client_name: "Acme".into(),
            client_email: "a@acme.test".into(),
            items: vec![LineItem::new("Work", 1, dec!(10))],
            due_date: NaiveDate::from_ymd_opt(2025, 1, 31),
            ..Default::default()
        };
        Invoice::new(owner.into(), number.into(), input, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn duplicate_invoice_number_is_a_conflict() {
        let store = MemoryStore::new();
        store.insert_invoice(&invoice("u1", "INV-1")).await.unwrap();
        let err = store.insert_invoice(&invoice("u2", "INV-1")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        store
            .insert_user(&User::new("A".into(), "a@x.test", "h".into()))
            .await
            .unwrap();
        let err = store
            .insert_user(&User::new("B".into(), "A@X.test", "h".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_by_owner_leaves_other_owners_alone() {
        let store = MemoryStore::new();
        store.insert_invoice(&invoice("u1", "INV-1")).await.unwrap();
        store.insert_invoice(&invoice("u1", "INV-2")).await.unwrap();
        store.insert_invoice(&invoice("u2", "INV-3")).await.unwrap();

        assert_eq!(store.delete_invoices_by_owner("u1").await.unwrap(), 2);
        let rest = store
            .find_invoices(&ListInvoicesFilter::default())
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].owner_id, "u2");
    }
}
