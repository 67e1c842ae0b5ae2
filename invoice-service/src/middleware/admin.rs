use axum::{extract::Request, middleware::Next, response::Response};
use service_core::error::AppError;

use crate::models::Caller;

/// Reject callers without the admin flag. Runs after [`super::auth_middleware`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    match request.extensions().get::<Caller>() {
        Some(caller) if caller.is_admin => Ok(next.run(request).await),
        Some(caller) => {
            tracing::warn!(user_id = %caller.id, "Non-admin attempted an admin action");
            Err(AppError::Forbidden(anyhow::anyhow!(
                "Not authorized as an admin"
            )))
        }
        None => Err(AppError::Unauthorized(anyhow::anyhow!(
            "Not authorized, no token"
        ))),
    }
}
