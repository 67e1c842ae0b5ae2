//! Line item model for invoice-service.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::services::ServiceError;

fn default_quantity() -> u32 {
    1
}

/// Line item embedded in an invoice.
///
/// `amount` is always derived from `quantity × rate`; a value supplied by the
/// client is accepted on input and overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LineItem {
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub rate: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

impl LineItem {
    /// An overflowing amount is left at zero; [`LineItem::recalculate`] reports it.
    pub fn new(description: impl Into<String>, quantity: u32, rate: Decimal) -> Self {
        let mut item = Self {
            description: description.into(),
            quantity,
            rate,
            amount: Decimal::ZERO,
        };
        item.amount = item.line_total().unwrap_or_default();
        item
    }

    /// `quantity × rate`, or `None` when the product does not fit a `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> {
        Decimal::from(self.quantity).checked_mul(self.rate)
    }

    pub fn recalculate(&mut self, index: usize) -> Result<(), ServiceError> {
        self.amount = self.line_total().ok_or_else(|| {
            ServiceError::validation(format!("items[{index}].rate"), "Line amount is too large")
        })?;
        Ok(())
    }

    /// Check a single item; `index` is used to name the offending field.
    pub fn validate(&self, index: usize) -> Result<(), ServiceError> {
        if self.description.trim().is_empty() {
            return Err(ServiceError::validation(
                format!("items[{index}].description"),
                "Item description is required",
            ));
        }
        if self.quantity < 1 {
            return Err(ServiceError::validation(
                format!("items[{index}].quantity"),
                "Quantity must be at least 1",
            ));
        }
        if self.rate < Decimal::ZERO {
            return Err(ServiceError::validation(
                format!("items[{index}].rate"),
                "Rate cannot be negative",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn amount_is_quantity_times_rate() {
        let item = LineItem::new("Consulting", 3, dec!(40.50));
        assert_eq!(item.amount, dec!(121.50));
    }

    #[test]
    fn client_supplied_amount_is_overwritten() {
        let mut item: LineItem =
            serde_json::from_str(r#"{"description":"Design","quantity":2,"rate":50,"amount":1}"#)
                .unwrap();
        item.recalculate(0).unwrap();
        assert_eq!(item.amount, dec!(100));
    }

    #[test]
    fn overflowing_amount_names_the_rate() {
        let rate = Decimal::from_scientific("7e27").unwrap();
        let mut item = LineItem::new("Huge", 4_000_000_000, rate);
        assert_eq!(item.amount, Decimal::ZERO);

        let err = item.recalculate(3).unwrap_err();
        assert!(err.to_string().starts_with("items[3].rate"));
    }

    #[test]
    fn quantity_defaults_to_one() {
        let item: LineItem =
            serde_json::from_str(r#"{"description":"Hosting","rate":25}"#).unwrap();
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn rejects_zero_quantity_and_negative_rate() {
        let zero_qty = LineItem::new("Widget", 0, dec!(5));
        let err = zero_qty.validate(0).unwrap_err();
        assert!(err.to_string().contains("items[0].quantity"));

        let negative = LineItem::new("Refund", 1, dec!(-5));
        let err = negative.validate(2).unwrap_err();
        assert!(err.to_string().contains("items[2].rate"));
    }

    #[test]
    fn rejects_blank_description() {
        let item = LineItem::new("  ", 1, dec!(5));
        assert!(item.validate(0).is_err());
    }
}
