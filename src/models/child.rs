use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub gender: String,
    pub birth_date: Option<NaiveDate>,
    pub id_card: Option<String>,
    pub school: Option<String>,
    pub grade: Option<String>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub guardian_relation: Option<String>,
    pub health_status: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Child row joined with the owning institution's name, for the parent view.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChildWithInstitution {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub child: Child,
    pub institution_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChildRequest {
    pub name: String,
    pub gender: String,
    pub birth_date: Option<NaiveDate>,
    pub id_card: Option<String>,
    pub school: Option<String>,
    pub grade: Option<String>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub guardian_relation: Option<String>,
    pub health_status: Option<String>,
    pub notes: Option<String>,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChildRequest {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub id_card: Option<String>,
    pub school: Option<String>,
    pub grade: Option<String>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub guardian_relation: Option<String>,
    pub health_status: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChildFilters {
    pub status: Option<String>,
    pub search: Option<String>,
}
