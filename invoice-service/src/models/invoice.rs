//! Invoice model for invoice-service.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{de::IgnoredAny, Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use validator::ValidateEmail;

use super::LineItem;
use crate::services::ServiceError;

/// Invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 5] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Pending,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
        InvoiceStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "Draft",
            InvoiceStatus::Pending => "Pending",
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Overdue => "Overdue",
            InvoiceStatus::Cancelled => "Cancelled",
        }
    }

    /// Money still owed to the invoice owner.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, InvoiceStatus::Pending | InvoiceStatus::Overdue)
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvoiceStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ServiceError::validation("status", format!("Unknown invoice status '{}'", s))
            })
    }
}

/// Derived money fields of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl Totals {
    /// `subtotal = Σ quantity × rate`, `tax = subtotal × tax_rate / 100`,
    /// `total = subtotal + tax − discount`.
    ///
    /// Fails with a validation error naming the input that pushed a value
    /// past the `Decimal` range.
    pub fn compute(
        items: &[LineItem],
        tax_rate: Decimal,
        discount: Decimal,
    ) -> Result<Self, ServiceError> {
        let mut subtotal = Decimal::ZERO;
        for (index, item) in items.iter().enumerate() {
            subtotal = item
                .line_total()
                .and_then(|amount| subtotal.checked_add(amount))
                .ok_or_else(|| too_large(format!("items[{index}].rate")))?;
        }
        let tax = subtotal
            .checked_mul(tax_rate)
            .map(|v| v / Decimal::ONE_HUNDRED)
            .ok_or_else(|| too_large("taxRate"))?;
        let total = subtotal
            .checked_add(tax)
            .and_then(|v| v.checked_sub(discount))
            .ok_or_else(|| too_large("total"))?;
        Ok(Self {
            subtotal,
            tax,
            total,
        })
    }
}

fn too_large(field: impl Into<String>) -> ServiceError {
    ServiceError::validation(field, "Amount is too large")
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Invoice document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(rename = "_id")]
    pub id: String,
    /// Owning user id. Never changes after creation.
    #[serde(rename = "user")]
    pub owner_id: String,
    pub invoice_number: String,
    pub client_name: String,
    pub client_email: String,
    #[serde(default)]
    pub client_address: String,
    #[serde(default)]
    pub client_phone: String,
    #[serde(default)]
    pub client_city: String,
    #[serde(default)]
    pub client_country: String,
    pub items: Vec<LineItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an invoice.
///
/// Ownership and numbering are assigned by the service and rejected here.
/// Client-sent totals are accepted and discarded; the service derives its own.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateInvoice {
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub client_email: String,
    #[serde(default)]
    pub client_address: String,
    #[serde(default)]
    pub client_phone: String,
    #[serde(default)]
    pub client_city: String,
    #[serde(default)]
    pub client_country: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub tax_rate: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub payment_method: String,
    pub paid_date: Option<NaiveDate>,
    pub subtotal: Option<IgnoredAny>,
    pub tax: Option<IgnoredAny>,
    pub total: Option<IgnoredAny>,
}

/// Whitelisted fields an owner may change on an existing invoice.
///
/// Absent fields keep their stored value. Unknown or immutable fields
/// (`user`, `invoiceNumber`, `_id`) are rejected at deserialization, while
/// client-sent totals are discarded.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateInvoice {
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_address: Option<String>,
    pub client_phone: Option<String>,
    pub client_city: Option<String>,
    pub client_country: Option<String>,
    pub items: Option<Vec<LineItem>>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub tax_rate: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub discount: Option<Decimal>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<InvoiceStatus>,
    pub notes: Option<String>,
    pub payment_method: Option<String>,
    /// `null` clears the stored date.
    #[serde(default, deserialize_with = "nullable")]
    pub paid_date: Option<Option<NaiveDate>>,
    pub subtotal: Option<IgnoredAny>,
    pub tax: Option<IgnoredAny>,
    pub total: Option<IgnoredAny>,
}

impl Invoice {
    /// Build a new invoice from client input. Items and totals are recomputed;
    /// call [`Invoice::validate`] before persisting.
    pub fn new(
        owner_id: String,
        invoice_number: String,
        input: CreateInvoice,
        now: DateTime<Utc>,
    ) -> Result<Self, ServiceError> {
        let due_date = input
            .due_date
            .ok_or_else(|| ServiceError::validation("dueDate", "Due date is required"))?;

        let mut invoice = Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id,
            invoice_number,
            client_name: input.client_name,
            client_email: input.client_email,
            client_address: input.client_address,
            client_phone: input.client_phone,
            client_city: input.client_city,
            client_country: input.client_country,
            items: input.items,
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            tax_rate: input.tax_rate,
            discount: input.discount,
            total: Decimal::ZERO,
            issue_date: input.issue_date.unwrap_or_else(|| now.date_naive()),
            due_date,
            status: input.status,
            notes: input.notes,
            payment_method: input.payment_method,
            paid_date: input.paid_date,
            created_at: now,
            updated_at: now,
        };
        invoice.recalculate()?;
        Ok(invoice)
    }

    /// Recompute item amounts and the invoice totals.
    pub fn recalculate(&mut self) -> Result<(), ServiceError> {
        for (index, item) in self.items.iter_mut().enumerate() {
            item.recalculate(index)?;
        }
        let totals = Totals::compute(&self.items, self.tax_rate, self.discount)?;
        self.subtotal = totals.subtotal;
        self.tax = totals.tax;
        self.total = totals.total;
        Ok(())
    }

    /// Overlay the provided fields, then recompute totals.
    pub fn apply(
        &mut self,
        patch: UpdateInvoice,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        if let Some(v) = patch.client_name {
            self.client_name = v;
        }
        if let Some(v) = patch.client_email {
            self.client_email = v;
        }
        if let Some(v) = patch.client_address {
            self.client_address = v;
        }
        if let Some(v) = patch.client_phone {
            self.client_phone = v;
        }
        if let Some(v) = patch.client_city {
            self.client_city = v;
        }
        if let Some(v) = patch.client_country {
            self.client_country = v;
        }
        if let Some(v) = patch.items {
            self.items = v;
        }
        if let Some(v) = patch.tax_rate {
            self.tax_rate = v;
        }
        if let Some(v) = patch.discount {
            self.discount = v;
        }
        if let Some(v) = patch.issue_date {
            self.issue_date = v;
        }
        if let Some(v) = patch.due_date {
            self.due_date = v;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = patch.notes {
            self.notes = v;
        }
        if let Some(v) = patch.payment_method {
            self.payment_method = v;
        }
        if let Some(v) = patch.paid_date {
            self.paid_date = v;
        }
        self.updated_at = now;
        self.recalculate()
    }

    /// Enforce the entity invariants, failing on the first offending field.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.client_name.trim().is_empty() {
            return Err(ServiceError::validation(
                "clientName",
                "Client name is required",
            ));
        }
        if self.client_email.trim().is_empty() {
            return Err(ServiceError::validation(
                "clientEmail",
                "Client email is required",
            ));
        }
        if !self.client_email.validate_email() {
            return Err(ServiceError::validation(
                "clientEmail",
                "Please provide a valid email",
            ));
        }
        if self.items.is_empty() {
            return Err(ServiceError::validation(
                "items",
                "Invoice must have at least one item",
            ));
        }
        for (index, item) in self.items.iter().enumerate() {
            item.validate(index)?;
        }

        let non_negative = [
            ("taxRate", self.tax_rate, "Tax rate cannot be negative"),
            ("discount", self.discount, "Discount cannot be negative"),
            ("subtotal", self.subtotal, "Subtotal cannot be negative"),
            ("tax", self.tax, "Tax cannot be negative"),
            ("total", self.total, "Total cannot be negative"),
        ];
        for (field, value, message) in non_negative {
            if value < Decimal::ZERO {
                return Err(ServiceError::validation(field, message));
            }
        }

        Ok(())
    }
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    /// `None` lists across all owners (admin scope).
    pub owner_id: Option<String>,
    pub status: Option<InvoiceStatus>,
    /// Case-insensitive substring over invoice number, client name and client email.
    pub search: Option<String>,
}

impl ListInvoicesFilter {
    pub fn for_owner(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, invoice: &Invoice) -> bool {
        if let Some(owner_id) = &self.owner_id {
            if &invoice.owner_id != owner_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if invoice.status != status {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref() {
            let needle = search.to_lowercase();
            let hit = [
                &invoice.invoice_number,
                &invoice.client_name,
                &invoice.client_email,
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Fields an invoice listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InvoiceSortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    IssueDate,
    DueDate,
    InvoiceNumber,
    ClientName,
    ClientEmail,
    Status,
    Subtotal,
    Total,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Ordering for invoice listings; defaults to newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvoiceSort {
    pub field: InvoiceSortField,
    pub order: SortOrder,
}

impl InvoiceSort {
    fn compare(&self, a: &Invoice, b: &Invoice) -> Ordering {
        let ordering = match self.field {
            InvoiceSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            InvoiceSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            InvoiceSortField::IssueDate => a.issue_date.cmp(&b.issue_date),
            InvoiceSortField::DueDate => a.due_date.cmp(&b.due_date),
            InvoiceSortField::InvoiceNumber => a.invoice_number.cmp(&b.invoice_number),
            InvoiceSortField::ClientName => a.client_name.cmp(&b.client_name),
            InvoiceSortField::ClientEmail => a.client_email.cmp(&b.client_email),
            InvoiceSortField::Status => a.status.as_str().cmp(b.status.as_str()),
            InvoiceSortField::Subtotal => a.subtotal.cmp(&b.subtotal),
            InvoiceSortField::Total => a.total.cmp(&b.total),
        };
        let ordering = match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        // Ties fall back to newest first.
        ordering.then_with(|| b.created_at.cmp(&a.created_at))
    }

    pub fn apply(&self, invoices: &mut [Invoice]) {
        invoices.sort_by(|a, b| self.compare(a, b));
    }
}
