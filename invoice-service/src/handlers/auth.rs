use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::auth::{LoginRequest, ProfileResponse, RegisterRequest, UpdateProfileRequest},
    middleware::AuthUser,
    utils::ValidatedJson,
    AppState,
};

pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = state.auth_service.register(req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.auth_service.login(req).await?))
}

pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth_service.profile(&caller).await?;
    Ok(Json(ProfileResponse {
        user: user.sanitized(),
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth_service.update_profile(&caller, req).await?;
    Ok(Json(ProfileResponse {
        user: user.sanitized(),
    }))
}
