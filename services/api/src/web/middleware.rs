//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::{auth::verify_token, state::AppState};

/// Middleware that validates the bearer token and extracts the caller's
/// identity.
///
/// A missing Authorization header is 401; a header that is present but does
/// not verify is 403. On success an `AuthContext` is inserted into the
/// request extensions for handlers to use.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract the Authorization header
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    // 2. Take the token after the "Bearer " scheme
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized)?;

    // 3. Verify the token and build the per-request identity
    let auth_context = verify_token(token, &state.config.jwt_secret)?;

    // 4. Insert the identity into request extensions
    req.extensions_mut().insert(auth_context);

    // 5. Continue to the handler
    Ok(next.run(req).await)
}
