use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The closed set of principal roles. `Admin` is the console credential from
/// configuration, never a users-table row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Institution,
    Parent,
    Resource,
    Government,
    Student,
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UserRole::Institution => "institution",
            UserRole::Parent => "parent",
            UserRole::Resource => "resource",
            UserRole::Government => "government",
            UserRole::Student => "student",
            UserRole::Admin => "admin",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "institution" => Ok(UserRole::Institution),
            "parent" => Ok(UserRole::Parent),
            "resource" => Ok(UserRole::Resource),
            "government" => Ok(UserRole::Government),
            "student" => Ok(UserRole::Student),
            "admin" => Ok(UserRole::Admin),
            _ => Err(anyhow::anyhow!("Unknown role: {s}")),
        }
    }
}

/// DB row struct. The role is carried as TEXT and parsed at the edges.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub real_name: Option<String>,
    pub phone: Option<String>,
    pub organization: Option<String>,
    pub institution_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub real_name: Option<String>,
    pub phone: Option<String>,
    pub organization: Option<String>,
    pub institution_id: Option<Uuid>,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            role: u.role.parse().unwrap_or(UserRole::Parent),
            real_name: u.real_name,
            phone: u.phone,
            organization: u.organization,
            institution_id: u.institution_id,
        }
    }
}

// Request/Response DTOs
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub role: UserRole,
    pub real_name: Option<String>,
    pub phone: Option<String>,
    /// Organization name; for institution create-mode this becomes the
    /// tenant's name.
    pub organization: Option<String>,
    /// Join-mode: attach to the tenant owning this code.
    pub invite_code: Option<String>,
    /// Create-mode: provision a fresh tenant.
    #[serde(default)]
    pub is_new_institution: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution_name: Option<String>,
}

/// Directory entry returned to institutions linking parents to children.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ParentSummary {
    pub id: Uuid,
    pub username: String,
    pub real_name: Option<String>,
    pub phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_string_round_trip() {
        for role in [
            UserRole::Institution,
            UserRole::Parent,
            UserRole::Resource,
            UserRole::Government,
            UserRole::Student,
            UserRole::Admin,
        ] {
            let parsed: UserRole = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("volunteer".parse::<UserRole>().is_err());
    }
}
