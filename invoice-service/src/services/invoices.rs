use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

use super::{metrics, numbering, stats::DashboardStats, InvoiceStore, ServiceError, Store};
use crate::models::{
    Caller, CreateInvoice, Invoice, InvoiceSort, ListInvoicesFilter, UpdateInvoice,
};

/// Invoice lifecycle for a single authenticated caller.
#[derive(Clone)]
pub struct InvoiceService {
    store: Arc<dyn Store>,
}

impl InvoiceService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Validate, number and persist a new invoice owned by the caller.
    #[instrument(skip(self, caller, input), fields(user_id = %caller.id))]
    pub async fn create(
        &self,
        caller: &Caller,
        input: CreateInvoice,
    ) -> Result<Invoice, ServiceError> {
        let now = Utc::now();
        let mut invoice = Invoice::new(caller.id.clone(), String::new(), input, now)?;
        invoice.validate()?;

        let existing = self
            .store
            .count_invoices(&ListInvoicesFilter::default())
            .await?;

        for number in numbering::candidate_numbers(now, existing) {
            invoice.invoice_number = number;
            match self.store.insert_invoice(&invoice).await {
                Ok(()) => {
                    metrics::record_invoice_created(invoice.status);
                    tracing::info!(
                        invoice_id = %invoice.id,
                        invoice_number = %invoice.invoice_number,
                        "Invoice created"
                    );
                    return Ok(invoice);
                }
                Err(ServiceError::Conflict(_)) => {
                    metrics::record_number_collision();
                    tracing::warn!(
                        invoice_number = %invoice.invoice_number,
                        "Invoice number already taken, trying next"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(ServiceError::Conflict(
            "Could not allocate a unique invoice number, please retry".to_string(),
        ))
    }

    /// Fetch an invoice visible to the caller (owner or admin).
    #[instrument(skip(self, caller), fields(user_id = %caller.id))]
    pub async fn get(&self, invoice_id: &str, caller: &Caller) -> Result<Invoice, ServiceError> {
        let invoice = self.find(invoice_id).await?;
        if invoice.owner_id != caller.id && !caller.is_admin {
            return Err(ServiceError::Forbidden(
                "Not authorized to access this invoice".to_string(),
            ));
        }
        Ok(invoice)
    }

    #[instrument(skip(self, caller, patch), fields(user_id = %caller.id))]
    pub async fn update(
        &self,
        invoice_id: &str,
        caller: &Caller,
        patch: UpdateInvoice,
    ) -> Result<Invoice, ServiceError> {
        let mut invoice = self.find(invoice_id).await?;
        if invoice.owner_id != caller.id {
            return Err(ServiceError::Forbidden(
                "Not authorized to update this invoice".to_string(),
            ));
        }

        invoice.apply(patch, Utc::now())?;
        invoice.validate()?;

        if !self.store.replace_invoice(&invoice).await? {
            return Err(ServiceError::invoice_not_found());
        }
        tracing::info!(invoice_id = %invoice.id, "Invoice updated");
        Ok(invoice)
    }

    #[instrument(skip(self, caller), fields(user_id = %caller.id))]
    pub async fn delete(&self, invoice_id: &str, caller: &Caller) -> Result<(), ServiceError> {
        let invoice = self.find(invoice_id).await?;
        if invoice.owner_id != caller.id {
            return Err(ServiceError::Forbidden(
                "Not authorized to delete this invoice".to_string(),
            ));
        }

        if !self.store.delete_invoice(invoice_id).await? {
            return Err(ServiceError::invoice_not_found());
        }
        metrics::record_invoice_deleted();
        tracing::info!(invoice_id = %invoice_id, "Invoice deleted");
        Ok(())
    }

    /// The caller's own invoices, filtered and sorted.
    #[instrument(skip(self, caller, filter), fields(user_id = %caller.id))]
    pub async fn list(
        &self,
        caller: &Caller,
        filter: ListInvoicesFilter,
        sort: InvoiceSort,
    ) -> Result<Vec<Invoice>, ServiceError> {
        let filter = ListInvoicesFilter {
            owner_id: Some(caller.id.clone()),
            ..filter
        };
        let mut invoices = self.store.find_invoices(&filter).await?;
        sort.apply(&mut invoices);
        Ok(invoices)
    }

    #[instrument(skip(self, caller), fields(user_id = %caller.id))]
    pub async fn dashboard(&self, caller: &Caller) -> Result<DashboardStats, ServiceError> {
        let invoices = self
            .store
            .find_invoices(&ListInvoicesFilter::for_owner(caller.id.clone()))
            .await?;
        Ok(DashboardStats::compute(&invoices))
    }

    async fn find(&self, invoice_id: &str) -> Result<Invoice, ServiceError> {
        self.store
            .find_invoice(invoice_id)
            .await?
            .ok_or_else(ServiceError::invoice_not_found)
    }
}
