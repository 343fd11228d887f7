//! Role-based data scoping. Every query over tenant-owned rows goes through
//! [`AccessScope::push_tenant_predicate`], so the isolation rule lives in one
//! place instead of being re-derived per route.

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::auth::AuthenticatedUser;
use crate::models::user::UserRole;

/// What a principal may see of a tenant-owned table.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessScope {
    /// Institution staff: exactly their own tenant.
    Tenant(Uuid),
    /// Parent: the tenants of their linked children. May be empty.
    TenantSet(Vec<Uuid>),
    /// Resource user: rows they created themselves (user-id ownership).
    Owner(Uuid),
    /// Government and admin: cross-tenant read.
    Unrestricted,
    Denied,
}

impl AccessScope {
    /// True when no row can be visible; callers short-circuit to an empty
    /// result without touching the resource table.
    pub fn is_empty(&self) -> bool {
        match self {
            AccessScope::Denied => true,
            AccessScope::TenantSet(ids) => ids.is_empty(),
            _ => false,
        }
    }

    /// Append the tenant predicate to a query ending in a WHERE clause.
    /// `Denied` and `Owner` push a contradiction rather than nothing, so a
    /// caller that skipped the `is_empty` check still cannot leak rows.
    pub fn push_tenant_predicate(&self, qb: &mut QueryBuilder<'_, Postgres>, column: &str) {
        match self {
            AccessScope::Tenant(id) => {
                qb.push(format!(" AND {column} = "));
                qb.push_bind(*id);
            }
            AccessScope::TenantSet(ids) => {
                qb.push(format!(" AND {column} = ANY("));
                qb.push_bind(ids.clone());
                qb.push(")");
            }
            AccessScope::Owner(_) | AccessScope::Denied => {
                qb.push(" AND FALSE");
            }
            AccessScope::Unrestricted => {}
        }
    }

    /// Ownership predicate for user-owned tables (resources).
    pub fn push_owner_predicate(&self, qb: &mut QueryBuilder<'_, Postgres>, column: &str) {
        match self {
            AccessScope::Owner(id) => {
                qb.push(format!(" AND {column} = "));
                qb.push_bind(*id);
            }
            AccessScope::Unrestricted => {}
            _ => {
                qb.push(" AND FALSE");
            }
        }
    }
}

/// Distinct tenants of the children linked to a parent account.
pub async fn parent_institutions(pool: &PgPool, parent_id: Uuid) -> Result<Vec<Uuid>, AppError> {
    let ids = sqlx::query_scalar(
        "SELECT DISTINCT institution_id FROM children WHERE parent_id = $1",
    )
    .bind(parent_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// Read scope over tenant-owned entities (children, check-ins, safety
/// checks, activities, notifications).
pub async fn tenant_read_scope(
    pool: &PgPool,
    user: &AuthenticatedUser,
) -> Result<AccessScope, AppError> {
    match user.role {
        UserRole::Institution => user
            .institution_id
            .map(AccessScope::Tenant)
            .ok_or(AppError::Forbidden),
        UserRole::Parent => Ok(AccessScope::TenantSet(
            parent_institutions(pool, user.id).await?,
        )),
        UserRole::Government | UserRole::Admin => Ok(AccessScope::Unrestricted),
        UserRole::Resource | UserRole::Student => Ok(AccessScope::Denied),
    }
}

/// Institution-only endpoints (including every tenant-owned mutation)
/// resolve the caller's tenant id here; any other role is forbidden.
pub fn require_institution(user: &AuthenticatedUser) -> Result<Uuid, AppError> {
    match user.role {
        UserRole::Institution => user.institution_id.ok_or(AppError::Forbidden),
        _ => Err(AppError::Forbidden),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> QueryBuilder<'static, Postgres> {
        QueryBuilder::new("SELECT * FROM t WHERE 1=1")
    }

    #[test]
    fn tenant_scope_pushes_equality() {
        let mut qb = builder();
        AccessScope::Tenant(Uuid::nil()).push_tenant_predicate(&mut qb, "institution_id");
        assert_eq!(qb.sql(), "SELECT * FROM t WHERE 1=1 AND institution_id = $1");
    }

    #[test]
    fn tenant_set_pushes_any() {
        let mut qb = builder();
        AccessScope::TenantSet(vec![Uuid::nil()]).push_tenant_predicate(&mut qb, "institution_id");
        assert_eq!(
            qb.sql(),
            "SELECT * FROM t WHERE 1=1 AND institution_id = ANY($1)"
        );
    }

    #[test]
    fn denied_and_owner_push_contradiction_for_tenant_tables() {
        for scope in [AccessScope::Denied, AccessScope::Owner(Uuid::nil())] {
            let mut qb = builder();
            scope.push_tenant_predicate(&mut qb, "institution_id");
            assert_eq!(qb.sql(), "SELECT * FROM t WHERE 1=1 AND FALSE");
        }
    }

    #[test]
    fn unrestricted_pushes_nothing() {
        let mut qb = builder();
        AccessScope::Unrestricted.push_tenant_predicate(&mut qb, "institution_id");
        assert_eq!(qb.sql(), "SELECT * FROM t WHERE 1=1");
    }

    #[test]
    fn owner_predicate_scopes_by_user() {
        let mut qb = builder();
        AccessScope::Owner(Uuid::nil()).push_owner_predicate(&mut qb, "user_id");
        assert_eq!(qb.sql(), "SELECT * FROM t WHERE 1=1 AND user_id = $1");

        let mut qb = builder();
        AccessScope::Tenant(Uuid::nil()).push_owner_predicate(&mut qb, "user_id");
        assert_eq!(qb.sql(), "SELECT * FROM t WHERE 1=1 AND FALSE");
    }

    #[test]
    fn empty_tenant_set_is_empty() {
        assert!(AccessScope::TenantSet(vec![]).is_empty());
        assert!(AccessScope::Denied.is_empty());
        assert!(!AccessScope::TenantSet(vec![Uuid::nil()]).is_empty());
        assert!(!AccessScope::Tenant(Uuid::nil()).is_empty());
        assert!(!AccessScope::Unrestricted.is_empty());
    }
}
