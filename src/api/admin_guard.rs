//! Admin access guard - restricts routes to identities with the admin role
//!
//! Must run after `require_auth`, which provides the Identity.

use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::require_role;
use crate::error::{AppError, AuthError};
use crate::models::{Identity, Role};

/// Middleware that rejects non-admin identities with 403 Forbidden.
pub async fn require_admin(req: Request<Body>, next: Next) -> Response {
    let Some(identity) = req.extensions().get::<Identity>() else {
        return AppError::from(AuthError::MissingToken).into_response();
    };

    match require_role(identity, Role::Admin) {
        Ok(()) => next.run(req).await,
        Err(e) => e.into_response(),
    }
}
