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
        activity::{
            Activity, ActivityFilters, ActivityRecord, CreateActivityRequest,
            UpdateActivityRequest,
        },
        auth::AuthenticatedUser,
        user::UserRole,
    },
    scope::{require_institution, tenant_read_scope},
    services::activities::ActivityService,
    AppState,
};

const READ_ROLES: [UserRole; 4] = [
    UserRole::Institution,
    UserRole::Parent,
    UserRole::Government,
    UserRole::Admin,
];

pub async fn list_activities(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filters): Query<ActivityFilters>,
) -> Result<Json<Vec<ActivityRecord>>, AppError> {
    require_role(&user, &READ_ROLES)?;
    let scope = tenant_read_scope(&state.db, &user).await?;
    let activities = ActivityService::list(&state.db, &scope, &filters).await?;
    Ok(Json(activities))
}

pub async fn get_activity(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ActivityRecord>, AppError> {
    require_role(&user, &READ_ROLES)?;
    let scope = tenant_read_scope(&state.db, &user).await?;
    let activity = ActivityService::get(&state.db, &scope, id).await?;
    Ok(Json(activity))
}

pub async fn create_activity(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateActivityRequest>,
) -> Result<(StatusCode, Json<Activity>), AppError> {
    let institution_id = require_institution(&user)?;
    let activity = ActivityService::create(&state.db, institution_id, user.id, &body).await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

pub async fn update_activity(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateActivityRequest>,
) -> Result<Json<Activity>, AppError> {
    let institution_id = require_institution(&user)?;
    let activity = ActivityService::update(&state.db, institution_id, id, &body).await?;
    Ok(Json(activity))
}

pub async fn delete_activity(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let institution_id = require_institution(&user)?;
    ActivityService::delete(&state.db, institution_id, id).await?;
    Ok(Json(json!({ "message": "Activity removed" })))
}
