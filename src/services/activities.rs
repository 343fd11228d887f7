use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::activity::{
        Activity, ActivityFilters, ActivityRecord, CreateActivityRequest, UpdateActivityRequest,
    },
    scope::AccessScope,
};

const UPDATE_ACTIVITY: &str = "UPDATE activities SET \
        activity_date = COALESCE($1, activity_date), \
        activity_type = COALESCE($2, activity_type), \
        title = COALESCE($3, title), \
        description = COALESCE($4, description), \
        start_time = COALESCE($5, start_time), \
        end_time = COALESCE($6, end_time), \
        participant_count = COALESCE($7, participant_count), \
        photos = COALESCE($8, photos), \
        updated_at = NOW() \
     WHERE id = $9 AND institution_id = $10 \
     RETURNING *";

const DELETE_ACTIVITY: &str = "DELETE FROM activities WHERE id = $1 AND institution_id = $2";

const SELECT_RECORD: &str = "SELECT a.*, i.name AS institution_name, u.real_name AS recorder_name
         FROM activities a
         LEFT JOIN institutions i ON a.institution_id = i.id
         LEFT JOIN users u ON a.recorder_id = u.id
         WHERE 1=1";

fn list_query<'a>(scope: &AccessScope, filters: &'a ActivityFilters) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(SELECT_RECORD);
    scope.push_tenant_predicate(&mut qb, "a.institution_id");
    if let Some(start) = filters.start_date {
        qb.push(" AND a.activity_date >= ");
        qb.push_bind(start);
    }
    if let Some(end) = filters.end_date {
        qb.push(" AND a.activity_date <= ");
        qb.push_bind(end);
    }
    if let Some(kind) = filters.activity_type {
        qb.push(" AND a.activity_type = ");
        qb.push_bind(kind.to_string());
    }
    qb.push(" ORDER BY a.activity_date DESC, a.start_time DESC");
    qb
}

fn get_query(scope: &AccessScope, id: Uuid) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(SELECT_RECORD);
    qb.push(" AND a.id = ");
    qb.push_bind(id);
    scope.push_tenant_predicate(&mut qb, "a.institution_id");
    qb
}

pub struct ActivityService;

impl ActivityService {
    pub async fn list(
        pool: &PgPool,
        scope: &AccessScope,
        filters: &ActivityFilters,
    ) -> Result<Vec<ActivityRecord>, AppError> {
        if scope.is_empty() {
            return Ok(vec![]);
        }
        let activities = list_query(scope, filters)
            .build_query_as::<ActivityRecord>()
            .fetch_all(pool)
            .await?;
        Ok(activities)
    }

    pub async fn get(
        pool: &PgPool,
        scope: &AccessScope,
        id: Uuid,
    ) -> Result<ActivityRecord, AppError> {
        if scope.is_empty() {
            return Err(AppError::NotFound);
        }
        let activity = get_query(scope, id)
            .build_query_as::<ActivityRecord>()
            .fetch_optional(pool)
            .await?;
        activity.ok_or(AppError::NotFound)
    }

    pub async fn create(
        pool: &PgPool,
        institution_id: Uuid,
        recorder_id: Uuid,
        req: &CreateActivityRequest,
    ) -> Result<Activity, AppError> {
        if req.title.trim().is_empty() {
            return Err(AppError::validation("Title is required"));
        }
        let activity = sqlx::query_as::<_, Activity>(
            "INSERT INTO activities (institution_id, recorder_id, activity_date, activity_type,
                title, description, start_time, end_time, participant_count, photos)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING *",
        )
        .bind(institution_id)
        .bind(recorder_id)
        .bind(req.activity_date)
        .bind(req.activity_type.to_string())
        .bind(&req.title)
        .bind(&req.description)
        .bind(req.start_time)
        .bind(req.end_time)
        .bind(req.participant_count.unwrap_or(0))
        .bind(json!(req.photos.clone().unwrap_or_default()))
        .fetch_one(pool)
        .await?;
        Ok(activity)
    }

    pub async fn update(
        pool: &PgPool,
        institution_id: Uuid,
        id: Uuid,
        req: &UpdateActivityRequest,
    ) -> Result<Activity, AppError> {
        let activity = sqlx::query_as::<_, Activity>(UPDATE_ACTIVITY)
            .bind(req.activity_date)
            .bind(req.activity_type.map(|t| t.to_string()))
            .bind(&req.title)
            .bind(&req.description)
            .bind(req.start_time)
            .bind(req.end_time)
            .bind(req.participant_count)
            .bind(req.photos.as_ref().map(|p| json!(p)))
            .bind(id)
            .bind(institution_id)
            .fetch_optional(pool)
            .await?;
        activity.ok_or(AppError::NotFound)
    }

    pub async fn delete(pool: &PgPool, institution_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(DELETE_ACTIVITY)
            .bind(id)
            .bind(institution_id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity::ActivityType;

    #[test]
    fn list_is_tenant_scoped_for_institution() {
        let filters = ActivityFilters::default();
        let mut qb = list_query(&AccessScope::Tenant(Uuid::nil()), &filters);
        assert!(qb.sql().contains("AND a.institution_id = $1"));
    }

    #[test]
    fn list_uses_set_predicate_for_parent() {
        let filters = ActivityFilters {
            activity_type: Some(ActivityType::Outdoor),
            ..Default::default()
        };
        let mut qb = list_query(&AccessScope::TenantSet(vec![Uuid::nil()]), &filters);
        let sql = qb.sql().to_string();
        assert!(sql.contains("AND a.institution_id = ANY($1)"));
        assert!(sql.contains("AND a.activity_type = $2"));
    }

    #[test]
    fn get_is_tenant_scoped() {
        let mut qb = get_query(&AccessScope::Tenant(Uuid::nil()), Uuid::nil());
        assert!(qb.sql().contains("AND a.institution_id = $2"));
    }

    #[test]
    fn denied_scope_cannot_match_rows() {
        let mut qb = get_query(&AccessScope::Denied, Uuid::nil());
        assert!(qb.sql().contains("AND FALSE"));
    }

    #[test]
    fn mutations_are_tenant_scoped() {
        assert!(UPDATE_ACTIVITY.contains("AND institution_id ="));
        assert!(DELETE_ACTIVITY.contains("AND institution_id ="));
    }
}
