use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::require_role,
    models::{
        auth::AuthenticatedUser,
        child::{
            Child, ChildFilters, ChildWithInstitution, CreateChildRequest, UpdateChildRequest,
        },
        user::UserRole,
    },
    scope::{require_institution, AccessScope},
    services::children::ChildService,
    AppState,
};

pub async fn list_children(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filters): Query<ChildFilters>,
) -> Result<Json<Vec<Child>>, AppError> {
    let institution_id = require_institution(&user)?;
    let children =
        ChildService::list(&state.db, &AccessScope::Tenant(institution_id), &filters).await?;
    Ok(Json(children))
}

pub async fn get_child(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Child>, AppError> {
    let institution_id = require_institution(&user)?;
    let child = ChildService::get(&state.db, &AccessScope::Tenant(institution_id), id).await?;
    Ok(Json(child))
}

pub async fn create_child(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateChildRequest>,
) -> Result<(StatusCode, Json<Child>), AppError> {
    let institution_id = require_institution(&user)?;
    let child = ChildService::create(&state.db, institution_id, &body).await?;
    Ok((StatusCode::CREATED, Json(child)))
}

pub async fn update_child(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateChildRequest>,
) -> Result<Json<Child>, AppError> {
    let institution_id = require_institution(&user)?;
    let child = ChildService::update(&state.db, institution_id, id, &body).await?;
    Ok(Json(child))
}

pub async fn delete_child(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let institution_id = require_institution(&user)?;
    ChildService::delete(&state.db, institution_id, id).await?;
    Ok(Json(json!({ "message": "Child removed" })))
}

/// Parent view over their linked children.
pub async fn my_children(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<ChildWithInstitution>>, AppError> {
    require_role(&user, &[UserRole::Parent])?;
    let children = ChildService::my_children(&state.db, user.id).await?;
    Ok(Json(children))
}
