use chrono::{Local, NaiveDate, NaiveTime};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::{is_unique_violation, AppError},
    models::checkin::{
        AbsentRequest, BatchCheckinRequest, BatchCheckinResponse, CheckinFilters, CheckinRecord,
        CheckinRequest, CheckoutRequest, TodayAttendance,
    },
};

const INSERT_CHECKIN: &str = "INSERT INTO daily_checkins \
        (child_id, institution_id, checkin_date, checkin_time, checkin_by, status, notes) \
     VALUES ($1, $2, $3, $4, $5, 'present', $6)";

const UPSERT_BATCH_CHECKIN: &str = "INSERT INTO daily_checkins \
        (child_id, institution_id, checkin_date, checkin_time, checkin_by, status) \
     VALUES ($1, $2, $3, $4, $5, 'present') \
     ON CONFLICT (child_id, checkin_date) DO UPDATE SET \
        checkin_time = EXCLUDED.checkin_time, \
        checkin_by = EXCLUDED.checkin_by";

const UPDATE_CHECKOUT: &str = "UPDATE daily_checkins \
     SET checkout_time = $1, checkout_by = $2 \
     WHERE child_id = $3 AND checkin_date = $4 AND institution_id = $5";

const UPSERT_ABSENT: &str = "INSERT INTO daily_checkins \
        (child_id, institution_id, checkin_date, status, notes) \
     VALUES ($1, $2, $3, 'absent', $4) \
     ON CONFLICT (child_id, checkin_date) DO UPDATE SET \
        status = 'absent', \
        notes = EXCLUDED.notes";

fn list_query<'a>(institution_id: Uuid, filters: &'a CheckinFilters) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT dc.*, c.name AS child_name, c.grade
         FROM daily_checkins dc
         JOIN children c ON dc.child_id = c.id
         WHERE dc.institution_id = ",
    );
    qb.push_bind(institution_id);
    if let Some(date) = filters.date {
        qb.push(" AND dc.checkin_date = ");
        qb.push_bind(date);
    }
    if let Some(child_id) = filters.child_id {
        qb.push(" AND dc.child_id = ");
        qb.push_bind(child_id);
    }
    qb.push(" ORDER BY dc.checkin_date DESC, dc.checkin_time DESC");
    qb
}

fn now_local() -> (NaiveDate, NaiveTime) {
    let now = Local::now().naive_local();
    (now.date(), now.time())
}

pub struct CheckinService;

impl CheckinService {
    pub async fn list(
        pool: &PgPool,
        institution_id: Uuid,
        filters: &CheckinFilters,
    ) -> Result<Vec<CheckinRecord>, AppError> {
        let records = list_query(institution_id, filters)
            .build_query_as::<CheckinRecord>()
            .fetch_all(pool)
            .await?;
        Ok(records)
    }

    /// Attendance board: every active child of the tenant with today's
    /// check-in state left-joined in.
    pub async fn today(pool: &PgPool, institution_id: Uuid) -> Result<Vec<TodayAttendance>, AppError> {
        let (today, _) = now_local();
        let rows = sqlx::query_as::<_, TodayAttendance>(
            "SELECT c.id, c.name, c.grade,
                    dc.id AS checkin_id, dc.checkin_time, dc.checkout_time,
                    dc.status, dc.checkin_by, dc.checkout_by
             FROM children c
             LEFT JOIN daily_checkins dc ON c.id = dc.child_id AND dc.checkin_date = $1
             WHERE c.institution_id = $2 AND c.status = 'active'
             ORDER BY c.name",
        )
        .bind(today)
        .bind(institution_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// At most one check-in per child per day; the second attempt conflicts
    /// instead of duplicating the row.
    pub async fn checkin(
        pool: &PgPool,
        institution_id: Uuid,
        req: &CheckinRequest,
    ) -> Result<(), AppError> {
        Self::assert_child_in_tenant(pool, institution_id, req.child_id).await?;
        let (today, now) = now_local();
        sqlx::query(INSERT_CHECKIN)
            .bind(req.child_id)
            .bind(institution_id)
            .bind(today)
            .bind(now)
            .bind(&req.checkin_by)
            .bind(&req.notes)
            .execute(pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::conflict("Child is already checked in today")
                } else {
                    e.into()
                }
            })?;
        Ok(())
    }

    /// Check-out requires today's check-in row to exist.
    pub async fn checkout(
        pool: &PgPool,
        institution_id: Uuid,
        req: &CheckoutRequest,
    ) -> Result<(), AppError> {
        let (today, now) = now_local();
        let result = sqlx::query(UPDATE_CHECKOUT)
            .bind(now)
            .bind(&req.checkout_by)
            .bind(req.child_id)
            .bind(today)
            .bind(institution_id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::validation(
                "No check-in recorded for this child today",
            ));
        }
        Ok(())
    }

    /// Per-item upsert; failures are logged and the overall call reports a
    /// success count. Ids outside the tenant are dropped up front.
    pub async fn batch_checkin(
        pool: &PgPool,
        institution_id: Uuid,
        req: &BatchCheckinRequest,
    ) -> Result<BatchCheckinResponse, AppError> {
        let eligible: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM children WHERE id = ANY($1) AND institution_id = $2",
        )
        .bind(&req.child_ids)
        .bind(institution_id)
        .fetch_all(pool)
        .await?;

        let (today, now) = now_local();
        let mut count = 0;
        for child_id in eligible {
            let outcome = sqlx::query(UPSERT_BATCH_CHECKIN)
                .bind(child_id)
                .bind(institution_id)
                .bind(today)
                .bind(now)
                .bind(&req.checkin_by)
                .execute(pool)
                .await;
            match outcome {
                Ok(_) => count += 1,
                Err(e) => tracing::warn!("batch check-in failed for child {child_id}: {e}"),
            }
        }
        Ok(BatchCheckinResponse { count })
    }

    pub async fn mark_absent(
        pool: &PgPool,
        institution_id: Uuid,
        req: &AbsentRequest,
    ) -> Result<(), AppError> {
        Self::assert_child_in_tenant(pool, institution_id, req.child_id).await?;
        let (today, _) = now_local();
        sqlx::query(UPSERT_ABSENT)
            .bind(req.child_id)
            .bind(institution_id)
            .bind(today)
            .bind(&req.notes)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// A child of another tenant is indistinguishable from a missing one.
    async fn assert_child_in_tenant(
        pool: &PgPool,
        institution_id: Uuid,
        child_id: Uuid,
    ) -> Result<(), AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM children WHERE id = $1 AND institution_id = $2)",
        )
        .bind(child_id)
        .bind(institution_id)
        .fetch_one(pool)
        .await?;
        if !exists {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_is_tenant_scoped() {
        let filters = CheckinFilters::default();
        let mut qb = list_query(Uuid::nil(), &filters);
        assert!(qb.sql().contains("dc.institution_id = $1"));
    }

    #[test]
    fn mutations_carry_tenant_or_upsert_key() {
        assert!(UPDATE_CHECKOUT.contains("AND institution_id ="));
        assert!(UPSERT_BATCH_CHECKIN.contains("ON CONFLICT (child_id, checkin_date)"));
        assert!(UPSERT_ABSENT.contains("ON CONFLICT (child_id, checkin_date)"));
    }
}
