use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        auth::AuthenticatedUser,
        resource::{
            CreateResourceRequest, Resource, ResourceFilters, ResourceRecord,
            ResourceStatus, ReviewResourceRequest, UpdateResourceRequest,
        },
        user::UserRole,
    },
    scope::AccessScope,
};

const SELECT_RECORD: &str = "SELECT r.*, u.real_name AS provider_name
         FROM resources r
         LEFT JOIN users u ON r.user_id = u.id
         WHERE 1=1";

/// Owner edits resubmit: content changes put the listing back in front of
/// reviewers and clear the previous review outcome.
const UPDATE_OWN_RESOURCE: &str = "UPDATE resources SET \
        org_type = COALESCE($1, org_type), \
        org_name = COALESCE($2, org_name), \
        resource_type = COALESCE($3, resource_type), \
        title = COALESCE($4, title), \
        description = COALESCE($5, description), \
        contact_name = COALESCE($6, contact_name), \
        contact_phone = COALESCE($7, contact_phone), \
        contact_email = COALESCE($8, contact_email), \
        status = 'pending', \
        reject_reason = NULL, \
        reviewed_at = NULL, \
        reviewed_by = NULL, \
        updated_at = NOW() \
     WHERE id = $9 AND user_id = $10 \
     RETURNING *";

const DELETE_OWN_RESOURCE: &str = "DELETE FROM resources WHERE id = $1 AND user_id = $2";

/// The expected-status guard keeps concurrent reviews from skipping a state.
const REVIEW_RESOURCE: &str = "UPDATE resources SET \
        status = $1, \
        reject_reason = $2, \
        reviewed_at = NOW(), \
        reviewed_by = $3, \
        updated_at = NOW() \
     WHERE id = $4 AND status = $5 \
     RETURNING *";

/// Visibility: owners see their own rows in any state, reviewers see
/// everything, everyone else sees only rows that have been through review.
fn visibility_scope(user: &AuthenticatedUser) -> (AccessScope, bool) {
    match user.role {
        UserRole::Resource => (AccessScope::Owner(user.id), false),
        UserRole::Government | UserRole::Admin => (AccessScope::Unrestricted, false),
        _ => (AccessScope::Unrestricted, true),
    }
}

fn list_query<'a>(
    scope: &AccessScope,
    hide_pending: bool,
    filters: &'a ResourceFilters,
) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(SELECT_RECORD);
    scope.push_owner_predicate(&mut qb, "r.user_id");
    if hide_pending {
        qb.push(" AND r.status != 'pending'");
    }
    if let Some(ref org_type) = filters.org_type {
        qb.push(" AND r.org_type = ");
        qb.push_bind(org_type);
    }
    if let Some(ref resource_type) = filters.resource_type {
        qb.push(" AND r.resource_type = ");
        qb.push_bind(resource_type);
    }
    if let Some(status) = filters.status {
        qb.push(" AND r.status = ");
        qb.push_bind(status.to_string());
    }
    qb.push(" ORDER BY r.created_at DESC");
    qb
}

fn get_query(scope: &AccessScope, hide_pending: bool, id: Uuid) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(SELECT_RECORD);
    qb.push(" AND r.id = ");
    qb.push_bind(id);
    scope.push_owner_predicate(&mut qb, "r.user_id");
    if hide_pending {
        qb.push(" AND r.status != 'pending'");
    }
    qb
}

pub struct ResourceService;

impl ResourceService {
    pub async fn list(
        pool: &PgPool,
        user: &AuthenticatedUser,
        filters: &ResourceFilters,
    ) -> Result<Vec<ResourceRecord>, AppError> {
        let (scope, hide_pending) = visibility_scope(user);
        let resources = list_query(&scope, hide_pending, filters)
            .build_query_as::<ResourceRecord>()
            .fetch_all(pool)
            .await?;
        Ok(resources)
    }

    pub async fn get(
        pool: &PgPool,
        user: &AuthenticatedUser,
        id: Uuid,
    ) -> Result<ResourceRecord, AppError> {
        let (scope, hide_pending) = visibility_scope(user);
        let resource = get_query(&scope, hide_pending, id)
            .build_query_as::<ResourceRecord>()
            .fetch_optional(pool)
            .await?;
        resource.ok_or(AppError::NotFound)
    }

    pub async fn create(
        pool: &PgPool,
        owner_id: Uuid,
        req: &CreateResourceRequest,
    ) -> Result<Resource, AppError> {
        if req.org_type.trim().is_empty()
            || req.org_name.trim().is_empty()
            || req.resource_type.trim().is_empty()
            || req.title.trim().is_empty()
        {
            return Err(AppError::validation(
                "Organization type, name, resource type and title are required",
            ));
        }
        let resource = sqlx::query_as::<_, Resource>(
            "INSERT INTO resources (user_id, org_type, org_name, resource_type, title,
                description, contact_name, contact_phone, contact_email)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING *",
        )
        .bind(owner_id)
        .bind(&req.org_type)
        .bind(&req.org_name)
        .bind(&req.resource_type)
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.contact_name)
        .bind(&req.contact_phone)
        .bind(&req.contact_email)
        .fetch_one(pool)
        .await?;
        Ok(resource)
    }

    /// Owner edits are allowed only before approval or after a rejection,
    /// and always resubmit the listing.
    pub async fn update_own(
        pool: &PgPool,
        owner_id: Uuid,
        id: Uuid,
        req: &UpdateResourceRequest,
    ) -> Result<Resource, AppError> {
        let status: Option<String> = sqlx::query_scalar(
            "SELECT status FROM resources WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;
        let status: ResourceStatus = status
            .ok_or(AppError::NotFound)?
            .parse()
            .map_err(AppError::Internal)?;
        if !status.editable_by_owner() {
            return Err(AppError::conflict(
                "Resource can no longer be edited in its current state",
            ));
        }

        let resource = sqlx::query_as::<_, Resource>(UPDATE_OWN_RESOURCE)
            .bind(&req.org_type)
            .bind(&req.org_name)
            .bind(&req.resource_type)
            .bind(&req.title)
            .bind(&req.description)
            .bind(&req.contact_name)
            .bind(&req.contact_phone)
            .bind(&req.contact_email)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await?;
        resource.ok_or(AppError::NotFound)
    }

    pub async fn delete_own(pool: &PgPool, owner_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(DELETE_OWN_RESOURCE)
            .bind(id)
            .bind(owner_id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Status transition by an elevated reviewer. A rejection records the
    /// reason; any other target state clears it.
    pub async fn review(
        pool: &PgPool,
        reviewer: &str,
        id: Uuid,
        req: &ReviewResourceRequest,
    ) -> Result<Resource, AppError> {
        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM resources WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?;
        let current: ResourceStatus = current
            .ok_or(AppError::NotFound)?
            .parse()
            .map_err(AppError::Internal)?;

        if !current.can_transition_to(req.status) {
            return Err(AppError::conflict(format!(
                "Cannot move a {current} resource to {}",
                req.status
            )));
        }

        let reject_reason = match req.status {
            ResourceStatus::Rejected => req.reject_reason.clone(),
            _ => None,
        };

        let resource = sqlx::query_as::<_, Resource>(REVIEW_RESOURCE)
            .bind(req.status.to_string())
            .bind(reject_reason)
            .bind(reviewer)
            .bind(id)
            .bind(current.to_string())
            .fetch_optional(pool)
            .await?;
        // A concurrent review moved the row first.
        resource.ok_or_else(|| AppError::conflict("Resource was reviewed concurrently"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner_user() -> AuthenticatedUser {
        AuthenticatedUser {
            id: Uuid::nil(),
            username: "donor".into(),
            role: UserRole::Resource,
            institution_id: None,
        }
    }

    #[test]
    fn owner_sees_only_own_rows() {
        let (scope, hide_pending) = visibility_scope(&owner_user());
        assert!(!hide_pending);
        let filters = ResourceFilters::default();
        let mut qb = list_query(&scope, hide_pending, &filters);
        assert!(qb.sql().contains("AND r.user_id = $1"));
    }

    #[test]
    fn non_owner_roles_never_see_pending() {
        for role in [UserRole::Institution, UserRole::Parent] {
            let user = AuthenticatedUser {
                role,
                ..owner_user()
            };
            let (scope, hide_pending) = visibility_scope(&user);
            let filters = ResourceFilters::default();
            let mut qb = list_query(&scope, hide_pending, &filters);
            assert!(qb.sql().contains("AND r.status != 'pending'"));
        }
    }

    #[test]
    fn reviewers_see_everything() {
        for role in [UserRole::Government, UserRole::Admin] {
            let user = AuthenticatedUser {
                role,
                ..owner_user()
            };
            let (scope, hide_pending) = visibility_scope(&user);
            let filters = ResourceFilters::default();
            let mut qb = list_query(&scope, hide_pending, &filters);
            let sql = qb.sql().to_string();
            assert!(!sql.contains("AND r.user_id ="));
            assert!(!sql.contains("status != 'pending'"));
        }
    }

    #[test]
    fn get_is_owner_scoped_for_resource_role() {
        let mut qb = get_query(&AccessScope::Owner(Uuid::nil()), false, Uuid::nil());
        assert!(qb.sql().contains("AND r.user_id = $2"));
    }

    #[test]
    fn mutations_are_owner_scoped_and_review_is_guarded() {
        assert!(UPDATE_OWN_RESOURCE.contains("AND user_id ="));
        assert!(DELETE_OWN_RESOURCE.contains("AND user_id ="));
        assert!(REVIEW_RESOURCE.contains("AND status ="));
    }
}
