use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::notification::{CreateNotificationRequest, Notification, NotificationRecord},
    scope::AccessScope,
};

const DELETE_NOTIFICATION: &str =
    "DELETE FROM notifications WHERE id = $1 AND institution_id = $2";

/// Parents see only notifications flagged public; staff see everything in
/// their own tenant.
fn list_query(scope: &AccessScope, public_only: bool) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT n.*, i.name AS institution_name, u.real_name AS creator_name
         FROM notifications n
         LEFT JOIN institutions i ON n.institution_id = i.id
         LEFT JOIN users u ON n.created_by = u.id
         WHERE 1=1",
    );
    scope.push_tenant_predicate(&mut qb, "n.institution_id");
    if public_only {
        qb.push(" AND n.is_public = TRUE");
    }
    qb.push(" ORDER BY n.created_at DESC");
    qb
}

pub struct NotificationService;

impl NotificationService {
    pub async fn list(
        pool: &PgPool,
        scope: &AccessScope,
        public_only: bool,
    ) -> Result<Vec<NotificationRecord>, AppError> {
        if scope.is_empty() {
            return Ok(vec![]);
        }
        let notifications = list_query(scope, public_only)
            .build_query_as::<NotificationRecord>()
            .fetch_all(pool)
            .await?;
        Ok(notifications)
    }

    pub async fn create(
        pool: &PgPool,
        institution_id: Uuid,
        created_by: Uuid,
        req: &CreateNotificationRequest,
    ) -> Result<Notification, AppError> {
        if req.title.trim().is_empty() || req.content.trim().is_empty() {
            return Err(AppError::validation("Title and content are required"));
        }
        let notification = sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (institution_id, created_by, title, content, type, is_public)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(institution_id)
        .bind(created_by)
        .bind(&req.title)
        .bind(&req.content)
        .bind(req.kind.as_deref().unwrap_or("announcement"))
        .bind(req.is_public.unwrap_or(true))
        .fetch_one(pool)
        .await?;
        Ok(notification)
    }

    pub async fn delete(pool: &PgPool, institution_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(DELETE_NOTIFICATION)
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

    #[test]
    fn list_is_tenant_scoped_for_institution() {
        let mut qb = list_query(&AccessScope::Tenant(Uuid::nil()), false);
        assert!(qb.sql().contains("AND n.institution_id = $1"));
    }

    #[test]
    fn parent_listing_is_public_only_over_linked_tenants() {
        let mut qb = list_query(&AccessScope::TenantSet(vec![Uuid::nil()]), true);
        let sql = qb.sql().to_string();
        assert!(sql.contains("AND n.institution_id = ANY($1)"));
        assert!(sql.contains("AND n.is_public = TRUE"));
    }

    #[test]
    fn delete_is_tenant_scoped() {
        assert!(DELETE_NOTIFICATION.contains("AND institution_id ="));
    }
}
