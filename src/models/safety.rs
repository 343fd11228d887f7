use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SafetyCheck {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub check_date: NaiveDate,
    pub checker_id: Option<Uuid>,
    pub venue_clean: bool,
    pub furniture_safe: bool,
    pub electrical_normal: bool,
    pub fire_exit_clear: bool,
    pub extinguisher_ready: bool,
    pub water_hygiene_ok: bool,
    pub attendance_done: bool,
    pub pickup_verified: bool,
    pub firstaid_complete: bool,
    pub has_incident: bool,
    pub incident_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Safety check joined with the checker's display name.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SafetyCheckRecord {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub check: SafetyCheck,
    pub checker_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSafetyCheckRequest {
    #[serde(default)]
    pub venue_clean: bool,
    #[serde(default)]
    pub furniture_safe: bool,
    #[serde(default)]
    pub electrical_normal: bool,
    #[serde(default)]
    pub fire_exit_clear: bool,
    #[serde(default)]
    pub extinguisher_ready: bool,
    #[serde(default)]
    pub water_hygiene_ok: bool,
    #[serde(default)]
    pub attendance_done: bool,
    #[serde(default)]
    pub pickup_verified: bool,
    #[serde(default)]
    pub firstaid_complete: bool,
    #[serde(default)]
    pub has_incident: bool,
    pub incident_notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyFilters {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodaySafetyResponse {
    pub checked: bool,
    pub data: Option<SafetyCheck>,
}

/// 30-day completion/incident aggregates.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SafetyStats {
    pub total_checks: i64,
    pub perfect_checks: i64,
    pub incident_count: i64,
}
