use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailyCheckin {
    pub id: Uuid,
    pub child_id: Uuid,
    pub institution_id: Uuid,
    pub checkin_date: NaiveDate,
    pub checkin_time: Option<NaiveTime>,
    pub checkin_by: Option<String>,
    pub checkout_time: Option<NaiveTime>,
    pub checkout_by: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Check-in row joined with the child's name and grade.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRecord {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub checkin: DailyCheckin,
    pub child_name: String,
    pub grade: Option<String>,
}

/// One row per active child for the attendance board, with today's
/// check-in state left-joined in.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TodayAttendance {
    pub id: Uuid,
    pub name: String,
    pub grade: Option<String>,
    pub checkin_id: Option<Uuid>,
    pub checkin_time: Option<NaiveTime>,
    pub checkout_time: Option<NaiveTime>,
    pub status: Option<String>,
    pub checkin_by: Option<String>,
    pub checkout_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinFilters {
    pub date: Option<NaiveDate>,
    pub child_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRequest {
    pub child_id: Uuid,
    pub checkin_by: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub child_id: Uuid,
    pub checkout_by: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCheckinRequest {
    pub child_ids: Vec<Uuid>,
    pub checkin_by: Option<String>,
}

/// Batch check-in reports a success count; per-item failures are logged,
/// not surfaced.
#[derive(Debug, Serialize)]
pub struct BatchCheckinResponse {
    pub count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsentRequest {
    pub child_id: Uuid,
    pub notes: Option<String>,
}
