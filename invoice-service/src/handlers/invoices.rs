use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::invoice::{DeleteInvoiceResponse, ListInvoicesQuery},
    middleware::AuthUser,
    models::{CreateInvoice, UpdateInvoice},
    utils::AppJson,
    AppState,
};

pub async fn list_invoices(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let invoices = state
        .invoice_service
        .list(&caller, query.filter()?, query.sort()?)
        .await?;
    Ok(Json(invoices))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    AppJson(input): AppJson<CreateInvoice>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state.invoice_service.create(&caller, input).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state.invoice_service.get(&id, &caller).await?;
    Ok(Json(invoice))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    AppJson(patch): AppJson<UpdateInvoice>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state.invoice_service.update(&id, &caller, patch).await?;
    Ok(Json(invoice))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.invoice_service.delete(&id, &caller).await?;
    Ok(Json(DeleteInvoiceResponse {
        message: "Invoice removed successfully".to_string(),
        id,
    }))
}

pub async fn dashboard_stats(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let stats = state.invoice_service.dashboard(&caller).await?;
    Ok(Json(stats))
}
