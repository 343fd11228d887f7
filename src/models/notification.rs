use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub created_by: Option<Uuid>,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

/// Notification joined with institution and author display names.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub notification: Notification,
    pub institution_name: Option<String>,
    pub creator_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub is_public: Option<bool>,
}
