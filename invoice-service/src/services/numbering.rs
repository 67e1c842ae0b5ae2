//! Invoice number generation: `INV-{yyyy}{mm}-{sequence:05}`.

use chrono::{DateTime, Datelike, Utc};

/// How many successive sequence numbers to try before giving up.
pub const MAX_NUMBER_ATTEMPTS: u64 = 5;

pub fn format_invoice_number(at: DateTime<Utc>, sequence: u64) -> String {
    format!("INV-{}{:02}-{:05}", at.year(), at.month(), sequence)
}

/// Candidate numbers for a collection currently holding `existing` invoices.
pub fn candidate_numbers(at: DateTime<Utc>, existing: u64) -> impl Iterator<Item = String> {
    (1..=MAX_NUMBER_ATTEMPTS).map(move |offset| format_invoice_number(at, existing + offset))
}
