use serde::de::{value::StrDeserializer, IntoDeserializer};
use serde::{Deserialize, Serialize};

use crate::models::{InvoiceSort, InvoiceSortField, InvoiceStatus, ListInvoicesFilter, SortOrder};
use crate::services::ServiceError;

/// Query string accepted by invoice listings.
///
/// Kept as raw strings so bad values surface as field-named validation errors.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInvoicesQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

impl ListInvoicesQuery {
    pub fn filter(&self) -> Result<ListInvoicesFilter, ServiceError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) if s.eq_ignore_ascii_case("all") => None,
            Some(s) => Some(s.parse::<InvoiceStatus>()?),
        };
        let search = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(ListInvoicesFilter {
            owner_id: None,
            status,
            search,
        })
    }

    pub fn sort(&self) -> Result<InvoiceSort, ServiceError> {
        let field = match self.sort_by.as_deref().map(str::trim) {
            None | Some("") => InvoiceSortField::default(),
            Some(s) => {
                let de: StrDeserializer<'_, serde::de::value::Error> = s.into_deserializer();
                InvoiceSortField::deserialize(de).map_err(|_| {
                    ServiceError::validation("sortBy", format!("Cannot sort invoices by '{}'", s))
                })?
            }
        };
        let order = match self.order.as_deref() {
            Some(o) if o.trim().eq_ignore_ascii_case("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        };
        Ok(InvoiceSort { field, order })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteInvoiceResponse {
    pub message: String,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(status: Option<&str>, sort_by: Option<&str>, order: Option<&str>) -> ListInvoicesQuery {
        ListInvoicesQuery {
            status: status.map(Into::into),
            search: Some("  ".into()),
            sort_by: sort_by.map(Into::into),
            order: order.map(Into::into),
        }
    }

    #[test]
    fn defaults_to_newest_first_without_filters() {
        let q = query(None, None, None);
        let filter = q.filter().unwrap();
        assert!(filter.status.is_none());
        assert!(filter.search.is_none());
        assert_eq!(q.sort().unwrap(), InvoiceSort::default());
    }

    #[test]
    fn all_status_means_no_filter() {
        assert!(query(Some("all"), None, None).filter().unwrap().status.is_none());
        assert_eq!(
            query(Some("pending"), None, None).filter().unwrap().status,
            Some(InvoiceStatus::Pending)
        );
    }

    #[test]
    fn rejects_unknown_status_and_sort_field() {
        assert!(query(Some("archived"), None, None).filter().is_err());
        let err = query(None, Some("password"), None).sort().unwrap_err();
        assert!(err.to_string().starts_with("sortBy"));
    }

    #[test]
    fn parses_whitelisted_sort() {
        let sort = query(None, Some("dueDate"), Some("asc")).sort().unwrap();
        assert_eq!(sort.field, InvoiceSortField::DueDate);
        assert_eq!(sort.order, SortOrder::Asc);
    }
}
