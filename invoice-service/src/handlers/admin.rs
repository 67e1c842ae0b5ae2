use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{admin::MessageResponse, invoice::ListInvoicesQuery},
    AppState,
};

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.admin_service.list_users().await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.admin_service.user_detail(&id).await?))
}

pub async fn toggle_admin(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.admin_service.toggle_admin(&id).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.admin_service.delete_user(&id).await?;
    Ok(Json(MessageResponse {
        message: "User and associated invoices deleted successfully".to_string(),
    }))
}

pub async fn list_all_invoices(
    State(state): State<AppState>,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let listing = state
        .admin_service
        .list_all_invoices(query.filter()?, query.sort()?)
        .await?;
    Ok(Json(listing))
}

pub async fn system_stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.admin_service.system_stats().await?))
}
