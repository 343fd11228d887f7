use chrono::Local;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::safety::{
        SafetyCheck, SafetyCheckRecord, SafetyFilters, SafetyStats, SubmitSafetyCheckRequest,
        TodaySafetyResponse,
    },
};

/// One row per (institution, date); resubmission replaces the checklist.
const UPSERT_SAFETY_CHECK: &str = "INSERT INTO safety_checks (
        institution_id, check_date, checker_id,
        venue_clean, furniture_safe, electrical_normal, fire_exit_clear,
        extinguisher_ready, water_hygiene_ok, attendance_done, pickup_verified,
        firstaid_complete, has_incident, incident_notes)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
     ON CONFLICT (institution_id, check_date) DO UPDATE SET
        checker_id = EXCLUDED.checker_id,
        venue_clean = EXCLUDED.venue_clean,
        furniture_safe = EXCLUDED.furniture_safe,
        electrical_normal = EXCLUDED.electrical_normal,
        fire_exit_clear = EXCLUDED.fire_exit_clear,
        extinguisher_ready = EXCLUDED.extinguisher_ready,
        water_hygiene_ok = EXCLUDED.water_hygiene_ok,
        attendance_done = EXCLUDED.attendance_done,
        pickup_verified = EXCLUDED.pickup_verified,
        firstaid_complete = EXCLUDED.firstaid_complete,
        has_incident = EXCLUDED.has_incident,
        incident_notes = EXCLUDED.incident_notes,
        updated_at = NOW()
     RETURNING *";

fn list_query<'a>(institution_id: Uuid, filters: &'a SafetyFilters) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT sc.*, u.real_name AS checker_name
         FROM safety_checks sc
         LEFT JOIN users u ON sc.checker_id = u.id
         WHERE sc.institution_id = ",
    );
    qb.push_bind(institution_id);
    if let Some(start) = filters.start_date {
        qb.push(" AND sc.check_date >= ");
        qb.push_bind(start);
    }
    if let Some(end) = filters.end_date {
        qb.push(" AND sc.check_date <= ");
        qb.push_bind(end);
    }
    qb.push(" ORDER BY sc.check_date DESC");
    qb
}

pub struct SafetyService;

impl SafetyService {
    pub async fn list(
        pool: &PgPool,
        institution_id: Uuid,
        filters: &SafetyFilters,
    ) -> Result<Vec<SafetyCheckRecord>, AppError> {
        let records = list_query(institution_id, filters)
            .build_query_as::<SafetyCheckRecord>()
            .fetch_all(pool)
            .await?;
        Ok(records)
    }

    pub async fn today(pool: &PgPool, institution_id: Uuid) -> Result<TodaySafetyResponse, AppError> {
        let today = Local::now().date_naive();
        let record = sqlx::query_as::<_, SafetyCheck>(
            "SELECT * FROM safety_checks WHERE institution_id = $1 AND check_date = $2",
        )
        .bind(institution_id)
        .bind(today)
        .fetch_optional(pool)
        .await?;
        Ok(TodaySafetyResponse {
            checked: record.is_some(),
            data: record,
        })
    }

    pub async fn submit(
        pool: &PgPool,
        institution_id: Uuid,
        checker_id: Uuid,
        req: &SubmitSafetyCheckRequest,
    ) -> Result<SafetyCheck, AppError> {
        if req.has_incident && req.incident_notes.as_deref().unwrap_or("").trim().is_empty() {
            return Err(AppError::validation(
                "Incident notes are required when an incident is reported",
            ));
        }
        let today = Local::now().date_naive();
        let check = sqlx::query_as::<_, SafetyCheck>(UPSERT_SAFETY_CHECK)
            .bind(institution_id)
            .bind(today)
            .bind(checker_id)
            .bind(req.venue_clean)
            .bind(req.furniture_safe)
            .bind(req.electrical_normal)
            .bind(req.fire_exit_clear)
            .bind(req.extinguisher_ready)
            .bind(req.water_hygiene_ok)
            .bind(req.attendance_done)
            .bind(req.pickup_verified)
            .bind(req.firstaid_complete)
            .bind(req.has_incident)
            .bind(&req.incident_notes)
            .fetch_one(pool)
            .await?;
        Ok(check)
    }

    /// Completion and incident counts over the trailing 30 days.
    pub async fn stats(pool: &PgPool, institution_id: Uuid) -> Result<SafetyStats, AppError> {
        let stats = sqlx::query_as::<_, SafetyStats>(
            "SELECT
                COUNT(*) AS total_checks,
                COUNT(*) FILTER (WHERE venue_clean AND furniture_safe AND electrical_normal
                    AND fire_exit_clear AND extinguisher_ready AND water_hygiene_ok
                    AND attendance_done AND pickup_verified AND firstaid_complete
                    AND NOT has_incident) AS perfect_checks,
                COUNT(*) FILTER (WHERE has_incident) AS incident_count
             FROM safety_checks
             WHERE institution_id = $1 AND check_date >= CURRENT_DATE - INTERVAL '30 days'",
        )
        .bind(institution_id)
        .fetch_one(pool)
        .await?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_is_tenant_scoped() {
        let filters = SafetyFilters::default();
        let mut qb = list_query(Uuid::nil(), &filters);
        assert!(qb.sql().contains("sc.institution_id = $1"));
    }

    #[test]
    fn submit_upserts_on_institution_and_date() {
        assert!(UPSERT_SAFETY_CHECK.contains("ON CONFLICT (institution_id, check_date)"));
    }
}
