//! Aggregate statistics over invoice sets.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Invoice, InvoiceSort, InvoiceStatus, User};

const RECENT_INVOICES: usize = 5;

/// Count of invoices per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusBreakdown {
    pub paid: u64,
    pub pending: u64,
    pub draft: u64,
    pub overdue: u64,
    pub cancelled: u64,
}

impl StatusBreakdown {
    pub fn from_invoices(invoices: &[Invoice]) -> Self {
        let mut breakdown = Self::default();
        for invoice in invoices {
            let slot = match invoice.status {
                InvoiceStatus::Paid => &mut breakdown.paid,
                InvoiceStatus::Pending => &mut breakdown.pending,
                InvoiceStatus::Draft => &mut breakdown.draft,
                InvoiceStatus::Overdue => &mut breakdown.overdue,
                InvoiceStatus::Cancelled => &mut breakdown.cancelled,
            };
            *slot += 1;
        }
        breakdown
    }
}

/// Sum of totals of paid invoices, saturating at `Decimal::MAX`.
pub fn total_revenue(invoices: &[Invoice]) -> Decimal {
    invoices
        .iter()
        .filter(|i| i.status == InvoiceStatus::Paid)
        .fold(Decimal::ZERO, |acc, i| acc.saturating_add(i.total))
}

/// Sum of totals of pending or overdue invoices.
pub fn total_outstanding(invoices: &[Invoice]) -> Decimal {
    invoices
        .iter()
        .filter(|i| i.status.is_outstanding())
        .fold(Decimal::ZERO, |acc, i| acc.saturating_add(i.total))
}

/// Per-user dashboard summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_outstanding: Decimal,
    pub paid_invoices: u64,
    pub pending_invoices: u64,
    pub draft_invoices: u64,
    pub overdue_invoices: u64,
    pub cancelled_invoices: u64,
    pub total_invoices: u64,
    pub recent_invoices: Vec<Invoice>,
}

impl DashboardStats {
    pub fn compute(invoices: &[Invoice]) -> Self {
        let breakdown = StatusBreakdown::from_invoices(invoices);

        let mut recent = invoices.to_vec();
        InvoiceSort::default().apply(&mut recent);
        recent.truncate(RECENT_INVOICES);

        Self {
            total_revenue: total_revenue(invoices),
            total_outstanding: total_outstanding(invoices),
            paid_invoices: breakdown.paid,
            pending_invoices: breakdown.pending,
            draft_invoices: breakdown.draft,
            overdue_invoices: breakdown.overdue,
            cancelled_invoices: breakdown.cancelled,
            total_invoices: invoices.len() as u64,
            recent_invoices: recent,
        }
    }
}

/// System-wide summary for administrators.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub total_users: u64,
    pub total_admins: u64,
    pub total_invoices: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_outstanding: Decimal,
    pub invoices_by_status: StatusBreakdown,
}

impl SystemStats {
    pub fn compute(users: &[User], invoices: &[Invoice]) -> Self {
        Self {
            total_users: users.len() as u64,
            total_admins: users.iter().filter(|u| u.is_admin).count() as u64,
            total_invoices: invoices.len() as u64,
            total_revenue: total_revenue(invoices),
            total_outstanding: total_outstanding(invoices),
            invoices_by_status: StatusBreakdown::from_invoices(invoices),
        }
    }
}
