use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::error::AppError;

/// Cross-tenant aggregates for the public dashboard. Deliberately unscoped:
/// these are platform-wide counts, not tenant data.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_children: i64,
    pub total_activities: i64,
    pub total_volunteers: i64,
    pub total_resources: i64,
    pub total_institutions: i64,
    pub monthly_children: i64,
    pub monthly_activities: i64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ActivityTrendPoint {
    pub month: String,
    pub count: i64,
    pub participants: i64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct TypeCount {
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub count: i64,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionRanking {
    pub institution_name: String,
    pub children_count: i64,
    pub capacity: i32,
}

#[derive(Debug, Serialize, FromRow)]
pub struct RegistrationTrendPoint {
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total: i64,
    pub parent: i64,
    pub institution: i64,
    pub resource: i64,
    pub government: i64,
    pub student: i64,
    pub today_new: i64,
}

#[derive(Debug, Serialize)]
pub struct ResourceStats {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub matched: i64,
    pub completed: i64,
}

/// Global snapshot for the admin console.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatistics {
    pub users: UserStats,
    pub institutions: i64,
    pub children: i64,
    pub activities: i64,
    pub checkins: i64,
    pub safety_checks: i64,
    pub resources: ResourceStats,
    pub notifications: i64,
    pub today_checkins: i64,
    pub user_trend: Vec<RegistrationTrendPoint>,
}

async fn count(pool: &PgPool, sql: &str) -> Result<i64, AppError> {
    let n: i64 = sqlx::query_scalar(sql).fetch_one(pool).await?;
    Ok(n)
}

fn count_for<'a>(pairs: &'a [(String, i64)], key: &str) -> i64 {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, n)| *n)
        .unwrap_or(0)
}

pub struct StatisticsService;

impl StatisticsService {
    pub async fn dashboard(pool: &PgPool) -> Result<DashboardStats, AppError> {
        Ok(DashboardStats {
            total_children: count(pool, "SELECT COUNT(*) FROM children WHERE status = 'active'").await?,
            total_activities: count(pool, "SELECT COUNT(*) FROM activities").await?,
            total_volunteers: count(pool, "SELECT COUNT(*) FROM users WHERE role = 'resource'").await?,
            total_resources: count(pool, "SELECT COUNT(*) FROM resources WHERE status = 'approved'").await?,
            total_institutions: count(pool, "SELECT COUNT(*) FROM institutions WHERE status = 'active'").await?,
            monthly_children: count(
                pool,
                "SELECT COUNT(*) FROM children WHERE date_trunc('month', created_at) = date_trunc('month', NOW())",
            )
            .await?,
            monthly_activities: count(
                pool,
                "SELECT COUNT(*) FROM activities WHERE date_trunc('month', activity_date) = date_trunc('month', NOW())",
            )
            .await?,
        })
    }

    /// Activity volume and participation over the trailing six months.
    pub async fn activity_trend(pool: &PgPool) -> Result<Vec<ActivityTrendPoint>, AppError> {
        let trend = sqlx::query_as::<_, ActivityTrendPoint>(
            "SELECT to_char(activity_date, 'YYYY-MM') AS month,
                    COUNT(*) AS count,
                    COALESCE(SUM(participant_count), 0)::BIGINT AS participants
             FROM activities
             WHERE activity_date >= CURRENT_DATE - INTERVAL '6 months'
             GROUP BY to_char(activity_date, 'YYYY-MM')
             ORDER BY month ASC",
        )
        .fetch_all(pool)
        .await?;
        Ok(trend)
    }

    pub async fn activity_types(pool: &PgPool) -> Result<Vec<TypeCount>, AppError> {
        let types = sqlx::query_as::<_, TypeCount>(
            "SELECT activity_type AS type, COUNT(*) AS count FROM activities GROUP BY activity_type",
        )
        .fetch_all(pool)
        .await?;
        Ok(types)
    }

    pub async fn resource_types(pool: &PgPool) -> Result<Vec<TypeCount>, AppError> {
        let types = sqlx::query_as::<_, TypeCount>(
            "SELECT resource_type AS type, COUNT(*) AS count
             FROM resources
             WHERE status = 'approved'
             GROUP BY resource_type",
        )
        .fetch_all(pool)
        .await?;
        Ok(types)
    }

    pub async fn institution_ranking(pool: &PgPool) -> Result<Vec<InstitutionRanking>, AppError> {
        let ranking = sqlx::query_as::<_, InstitutionRanking>(
            "SELECT i.name AS institution_name,
                    COUNT(c.id) AS children_count,
                    i.capacity
             FROM institutions i
             LEFT JOIN children c ON i.id = c.institution_id AND c.status = 'active'
             WHERE i.status = 'active'
             GROUP BY i.id
             ORDER BY children_count DESC
             LIMIT 10",
        )
        .fetch_all(pool)
        .await?;
        Ok(ranking)
    }

    pub async fn admin_statistics(pool: &PgPool) -> Result<AdminStatistics, AppError> {
        let users_by_role: Vec<(String, i64)> =
            sqlx::query_as("SELECT role, COUNT(*) FROM users GROUP BY role")
                .fetch_all(pool)
                .await?;
        let resources_by_status: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM resources GROUP BY status")
                .fetch_all(pool)
                .await?;

        let user_trend = sqlx::query_as::<_, RegistrationTrendPoint>(
            "SELECT created_at::DATE AS date, COUNT(*) AS count
             FROM users
             WHERE created_at >= CURRENT_DATE - INTERVAL '7 days'
             GROUP BY created_at::DATE
             ORDER BY date ASC",
        )
        .fetch_all(pool)
        .await?;

        Ok(AdminStatistics {
            users: UserStats {
                total: users_by_role.iter().map(|(_, n)| n).sum(),
                parent: count_for(&users_by_role, "parent"),
                institution: count_for(&users_by_role, "institution"),
                resource: count_for(&users_by_role, "resource"),
                government: count_for(&users_by_role, "government"),
                student: count_for(&users_by_role, "student"),
                today_new: count(
                    pool,
                    "SELECT COUNT(*) FROM users WHERE created_at::DATE = CURRENT_DATE",
                )
                .await?,
            },
            institutions: count(pool, "SELECT COUNT(*) FROM institutions WHERE status = 'active'").await?,
            children: count(pool, "SELECT COUNT(*) FROM children WHERE status = 'active'").await?,
            activities: count(pool, "SELECT COUNT(*) FROM activities").await?,
            checkins: count(pool, "SELECT COUNT(*) FROM daily_checkins").await?,
            safety_checks: count(pool, "SELECT COUNT(*) FROM safety_checks").await?,
            resources: ResourceStats {
                total: resources_by_status.iter().map(|(_, n)| n).sum(),
                pending: count_for(&resources_by_status, "pending"),
                approved: count_for(&resources_by_status, "approved"),
                rejected: count_for(&resources_by_status, "rejected"),
                matched: count_for(&resources_by_status, "matched"),
                completed: count_for(&resources_by_status, "completed"),
            },
            notifications: count(pool, "SELECT COUNT(*) FROM notifications").await?,
            today_checkins: count(
                pool,
                "SELECT COUNT(*) FROM daily_checkins WHERE checkin_date = CURRENT_DATE",
            )
            .await?,
            user_trend,
        })
    }
}
