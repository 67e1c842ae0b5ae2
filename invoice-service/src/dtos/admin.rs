use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Invoice, OwnerSummary, UserResponse};
use crate::services::ServiceError;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersListResponse {
    pub total_users: u64,
    pub users: Vec<UserResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetailResponse {
    pub user: UserResponse,
    pub invoice_count: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleAdminResponse {
    pub message: String,
    pub user: RoleSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminInvoicesResponse {
    pub total_invoices: u64,
    pub invoices: Vec<serde_json::Value>,
}

/// Serialize an invoice with its `user` id replaced by the owner's summary.
/// A missing owner is rendered as `null`.
pub fn invoice_with_owner(
    invoice: &Invoice,
    owner: Option<OwnerSummary>,
) -> Result<serde_json::Value, ServiceError> {
    let mut value =
        serde_json::to_value(invoice).map_err(|e| ServiceError::Internal(e.into()))?;
    let owner = serde_json::to_value(owner).map_err(|e| ServiceError::Internal(e.into()))?;
    if let Some(fields) = value.as_object_mut() {
        fields.insert("user".to_string(), owner);
    }
    Ok(value)
}
