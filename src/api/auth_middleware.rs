//! Authentication middleware - validates the bearer token on REST requests
//!
//! Extracts `Authorization: Bearer <jwt>`, runs it through the auth gate
//! and injects the resulting `Identity` into request extensions.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::AuthGate;
use crate::error::{AppError, AuthError};

/// Middleware that requires a valid bearer token.
/// On success, injects Identity into request extensions.
pub async fn require_auth(
    State(auth): State<Arc<AuthGate>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer_token(req.headers()) {
        Ok(token) => token.to_string(),
        Err(e) => return AppError::from(e).into_response(),
    };

    match auth.authenticate(&token).await {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!("Rejected request to {}: {}", req.uri().path(), e);
            e.into_response()
        }
    }
}

/// Extract the token from an `Authorization: Bearer ...` header
fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}
