use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::auth::{AuthenticatedUser, Claims};
use crate::models::user::UserRole;

/// Extension type carrying the session-signing secret through request
/// extensions.
#[derive(Clone)]
pub struct JwtSecret(pub String);

impl<S> FromRequestParts<S> for AuthenticatedUser
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

        decode_session_token(token, &secret.0)
    }
}

pub fn decode_session_token(token: &str, secret: &str) -> Result<AuthenticatedUser, AppError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data =
        decode::<Claims>(token, &key, &validation).map_err(|_| AppError::InvalidSession)?;
    let claims = data.claims;

    let id: Uuid = claims.sub.parse().map_err(|_| AppError::InvalidSession)?;
    Ok(AuthenticatedUser {
        id,
        username: claims.username,
        role: claims.role,
        institution_id: claims.institution_id,
    })
}

/// Allow-list guard called at the top of each role-gated handler.
pub fn require_role(user: &AuthenticatedUser, allowed: &[UserRole]) -> Result<(), AppError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::AuthService;

    #[test]
    fn token_round_trip() {
        let user_id = Uuid::new_v4();
        let tenant = Uuid::new_v4();
        let token = AuthService::generate_session_token(
            user_id,
            "staff1",
            UserRole::Institution,
            Some(tenant),
            "secret",
            3600,
        )
        .unwrap();

        let user = decode_session_token(&token, "secret").unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(user.username, "staff1");
        assert_eq!(user.role, UserRole::Institution);
        assert_eq!(user.institution_id, Some(tenant));
    }

    #[test]
    fn wrong_secret_is_invalid_session() {
        let token = AuthService::generate_session_token(
            Uuid::new_v4(),
            "p",
            UserRole::Parent,
            None,
            "secret-a",
            3600,
        )
        .unwrap();
        assert!(matches!(
            decode_session_token(&token, "secret-b"),
            Err(AppError::InvalidSession)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        // Expiry far enough in the past to clear the default decode leeway.
        let token = AuthService::generate_session_token_at(
            Uuid::new_v4(),
            "p",
            UserRole::Parent,
            None,
            "secret",
            3600,
            chrono::Utc::now().timestamp() as usize - 7200,
        )
        .unwrap();
        assert!(matches!(
            decode_session_token(&token, "secret"),
            Err(AppError::InvalidSession)
        ));
    }

    #[test]
    fn role_guard() {
        let user = AuthenticatedUser {
            id: Uuid::new_v4(),
            username: "p".into(),
            role: UserRole::Parent,
            institution_id: None,
        };
        assert!(require_role(&user, &[UserRole::Institution, UserRole::Parent]).is_ok());
        assert!(matches!(
            require_role(&user, &[UserRole::Institution]),
            Err(AppError::Forbidden)
        ));
    }
}
