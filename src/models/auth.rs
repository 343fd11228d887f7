use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserRole;

/// Claims embedded in the session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user UUID; nil for the admin console principal
    pub username: String,
    pub role: UserRole,
    /// Tenant identifier, present for institution principals only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution_id: Option<Uuid>,
    pub exp: usize,
    pub iat: usize,
}

/// Extracted from the validated token, available via axum extractors.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub institution_id: Option<Uuid>,
}
