//! Auth gate - bearer token verification shared by REST and WebSocket
//!
//! Tokens are HS256 JWTs issued by the login service. Verification checks
//! signature, `exp`, the validity window against `iat`, and finally asks the
//! user store whether the principal is still active.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};

use crate::config::AuthConfig;
use crate::error::{AppError, AuthError};
use crate::models::{Identity, Role, TokenClaims};

/// Lookup of principals referenced by tokens
#[async_trait]
pub trait UserStore: Send + Sync {
    /// `Ok(false)` for unknown or deactivated users
    async fn is_active(&self, user_id: &str) -> anyhow::Result<bool>;
}

pub struct AuthGate {
    decoding_key: DecodingKey,
    validation: Validation,
    validity_secs: u64,
    users: Arc<dyn UserStore>,
}

impl AuthGate {
    pub fn new(config: &AuthConfig, users: Arc<dyn UserStore>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            validity_secs: config.token_validity_days * 24 * 3600,
            users,
        }
    }

    /// Validate a raw token and resolve it to an active identity
    pub async fn authenticate(&self, token: &str) -> Result<Identity, AppError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken.into());
        }

        let claims = self.decode_claims(token)?;

        let active = self
            .users
            .is_active(&claims.user_id)
            .await
            .map_err(|e| AppError::Internal(format!("User lookup failed: {}", e)))?;

        if !active {
            tracing::debug!("Token for inactive user {} rejected", claims.user_id);
            return Err(AuthError::InactiveUser.into());
        }

        Ok(Identity::from(claims))
    }

    fn decode_claims(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => {
                    tracing::debug!("Invalid token: {}", e);
                    AuthError::InvalidToken
                }
            },
        )?;

        let claims = data.claims;
        if let Some(iat) = claims.iat {
            let now = chrono::Utc::now().timestamp().max(0) as u64;
            if now.saturating_sub(iat as u64) > self.validity_secs {
                return Err(AuthError::ExpiredToken);
            }
        }

        Ok(claims)
    }
}

/// Check that an identity carries the required role. Admins pass every check.
pub fn require_role(identity: &Identity, role: Role) -> Result<(), AppError> {
    if identity.role == role || identity.role == Role::Admin {
        Ok(())
    } else {
        tracing::warn!(
            "Access denied for {}: role {} required, has {}",
            identity.username,
            role,
            identity.role
        );
        Err(AppError::Forbidden(role))
    }
}
