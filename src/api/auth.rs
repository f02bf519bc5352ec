use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use super::error::ApiError;
use super::ApiState;

/// Require `Authorization: Bearer <secret>` when a secret is configured.
pub async fn require_secret(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.secret.is_empty() {
        return Ok(next.run(request).await);
    }

    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token == &*state.secret)
        .unwrap_or(false);

    if authorized {
        Ok(next.run(request).await)
    } else {
        Err(ApiError::Unauthorized)
    }
}
