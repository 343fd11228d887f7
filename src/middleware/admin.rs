use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::middleware::auth::{decode_session_token, JwtSecret};
use crate::models::auth::AuthenticatedUser;
use crate::models::user::UserRole;

/// Extractor for the admin console principal. The admin credential comes
/// from configuration, not the users table; its session token carries the
/// `admin` role and a nil subject id.
pub struct AdminPrincipal(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for AdminPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthenticated)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthenticated)?;

        let secret = parts
            .extensions
            .get::<JwtSecret>()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("JWT secret not configured")))?;

        let user = decode_session_token(token, &secret.0)?;
        if user.role != UserRole::Admin {
            return Err(AppError::Forbidden);
        }
        Ok(AdminPrincipal(user))
    }
}
