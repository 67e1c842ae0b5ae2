use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::{models::Caller, services::ServiceError, AppState};

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Middleware to require authentication.
///
/// Verifies the bearer token, loads the user it names and attaches a
/// [`Caller`] to the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req)
        .ok_or_else(|| ServiceError::Unauthenticated("Not authorized, no token".to_string()))?;

    let caller = state.auth_service.authenticate(token).await?;
    tracing::Span::current().record("user_id", caller.id.as_str());

    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}

/// Extractor for the authenticated caller
pub struct AuthUser(pub Caller);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let caller = parts.extensions.get::<Caller>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Caller missing from request extensions"
            ))
        })?;

        Ok(AuthUser(caller.clone()))
    }
}
