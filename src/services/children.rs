use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::child::{
        Child, ChildFilters, ChildWithInstitution, CreateChildRequest, UpdateChildRequest,
    },
    scope::AccessScope,
};

const CHILD_STATUSES: [&str; 3] = ["active", "graduated", "transferred"];

const UPDATE_CHILD: &str = "UPDATE children SET \
        name = COALESCE($1, name), \
        gender = COALESCE($2, gender), \
        birth_date = COALESCE($3, birth_date), \
        id_card = COALESCE($4, id_card), \
        school = COALESCE($5, school), \
        grade = COALESCE($6, grade), \
        guardian_name = COALESCE($7, guardian_name), \
        guardian_phone = COALESCE($8, guardian_phone), \
        guardian_relation = COALESCE($9, guardian_relation), \
        health_status = COALESCE($10, health_status), \
        notes = COALESCE($11, notes), \
        status = COALESCE($12, status), \
        parent_id = COALESCE($13, parent_id), \
        updated_at = NOW() \
     WHERE id = $14 AND institution_id = $15 \
     RETURNING *";

const DELETE_CHILD: &str = "DELETE FROM children WHERE id = $1 AND institution_id = $2";

fn list_query<'a>(scope: &AccessScope, filters: &'a ChildFilters) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new("SELECT * FROM children WHERE 1=1");
    scope.push_tenant_predicate(&mut qb, "institution_id");
    if let Some(ref status) = filters.status {
        qb.push(" AND status = ");
        qb.push_bind(status);
    }
    if let Some(ref search) = filters.search {
        let pattern = format!("%{search}%");
        qb.push(" AND (name ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR school ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
    qb.push(" ORDER BY created_at DESC");
    qb
}

fn get_query(scope: &AccessScope, id: Uuid) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT * FROM children WHERE id = ");
    qb.push_bind(id);
    scope.push_tenant_predicate(&mut qb, "institution_id");
    qb
}

pub struct ChildService;

impl ChildService {
    pub async fn list(
        pool: &PgPool,
        scope: &AccessScope,
        filters: &ChildFilters,
    ) -> Result<Vec<Child>, AppError> {
        if scope.is_empty() {
            return Ok(vec![]);
        }
        let children = list_query(scope, filters)
            .build_query_as::<Child>()
            .fetch_all(pool)
            .await?;
        Ok(children)
    }

    /// Rows outside the caller's scope are indistinguishable from missing
    /// rows.
    pub async fn get(pool: &PgPool, scope: &AccessScope, id: Uuid) -> Result<Child, AppError> {
        if scope.is_empty() {
            return Err(AppError::NotFound);
        }
        let child = get_query(scope, id)
            .build_query_as::<Child>()
            .fetch_optional(pool)
            .await?;
        child.ok_or(AppError::NotFound)
    }

    /// Parent view: children linked to this account, with the institution
    /// name joined in.
    pub async fn my_children(
        pool: &PgPool,
        parent_id: Uuid,
    ) -> Result<Vec<ChildWithInstitution>, AppError> {
        let children = sqlx::query_as::<_, ChildWithInstitution>(
            "SELECT c.*, i.name AS institution_name
             FROM children c
             LEFT JOIN institutions i ON c.institution_id = i.id
             WHERE c.parent_id = $1
             ORDER BY c.name",
        )
        .bind(parent_id)
        .fetch_all(pool)
        .await?;
        Ok(children)
    }

    pub async fn create(
        pool: &PgPool,
        institution_id: Uuid,
        req: &CreateChildRequest,
    ) -> Result<Child, AppError> {
        if req.name.trim().is_empty() || req.gender.trim().is_empty() {
            return Err(AppError::validation("Name and gender are required"));
        }
        let child = sqlx::query_as::<_, Child>(
            "INSERT INTO children (institution_id, parent_id, name, gender, birth_date, id_card,
                school, grade, guardian_name, guardian_phone, guardian_relation, health_status, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING *",
        )
        .bind(institution_id)
        .bind(req.parent_id)
        .bind(&req.name)
        .bind(&req.gender)
        .bind(req.birth_date)
        .bind(&req.id_card)
        .bind(&req.school)
        .bind(&req.grade)
        .bind(&req.guardian_name)
        .bind(&req.guardian_phone)
        .bind(&req.guardian_relation)
        .bind(&req.health_status)
        .bind(&req.notes)
        .fetch_one(pool)
        .await?;
        Ok(child)
    }

    pub async fn update(
        pool: &PgPool,
        institution_id: Uuid,
        id: Uuid,
        req: &UpdateChildRequest,
    ) -> Result<Child, AppError> {
        if let Some(ref status) = req.status {
            if !CHILD_STATUSES.contains(&status.as_str()) {
                return Err(AppError::validation(format!("Unknown child status: {status}")));
            }
        }
        let child = sqlx::query_as::<_, Child>(UPDATE_CHILD)
            .bind(&req.name)
            .bind(&req.gender)
            .bind(req.birth_date)
            .bind(&req.id_card)
            .bind(&req.school)
            .bind(&req.grade)
            .bind(&req.guardian_name)
            .bind(&req.guardian_phone)
            .bind(&req.guardian_relation)
            .bind(&req.health_status)
            .bind(&req.notes)
            .bind(&req.status)
            .bind(req.parent_id)
            .bind(id)
            .bind(institution_id)
            .fetch_optional(pool)
            .await?;
        child.ok_or(AppError::NotFound)
    }

    pub async fn delete(pool: &PgPool, institution_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(DELETE_CHILD)
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
        let scope = AccessScope::Tenant(Uuid::nil());
        let filters = ChildFilters::default();
        let mut qb = list_query(&scope, &filters);
        assert!(qb.sql().contains("AND institution_id = $1"));
    }

    #[test]
    fn list_uses_set_predicate_for_parent() {
        let scope = AccessScope::TenantSet(vec![Uuid::nil()]);
        let filters = ChildFilters {
            status: Some("active".into()),
            search: None,
        };
        let mut qb = list_query(&scope, &filters);
        let sql = qb.sql().to_string();
        assert!(sql.contains("AND institution_id = ANY($1)"));
        assert!(sql.contains("AND status = $2"));
    }

    #[test]
    fn list_is_impossible_when_denied() {
        let filters = ChildFilters::default();
        let mut qb = list_query(&AccessScope::Denied, &filters);
        assert!(qb.sql().contains("AND FALSE"));
    }

    #[test]
    fn get_is_tenant_scoped() {
        let mut qb = get_query(&AccessScope::Tenant(Uuid::nil()), Uuid::nil());
        assert!(qb.sql().contains("AND institution_id = $2"));
    }

    #[test]
    fn mutations_are_tenant_scoped() {
        assert!(UPDATE_CHILD.contains("AND institution_id ="));
        assert!(DELETE_CHILD.contains("AND institution_id ="));
    }
}
