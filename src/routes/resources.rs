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
        resource::{
            CreateResourceRequest, Resource, ResourceFilters, ResourceRecord,
            ReviewResourceRequest, UpdateResourceRequest,
        },
        user::UserRole,
    },
    services::resources::ResourceService,
    AppState,
};

/// Students have no access to resource listings; everyone else sees what
/// their role permits.
const LIST_ROLES: [UserRole; 5] = [
    UserRole::Institution,
    UserRole::Parent,
    UserRole::Resource,
    UserRole::Government,
    UserRole::Admin,
];

pub async fn list_resources(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filters): Query<ResourceFilters>,
) -> Result<Json<Vec<ResourceRecord>>, AppError> {
    require_role(&user, &LIST_ROLES)?;
    let resources = ResourceService::list(&state.db, &user, &filters).await?;
    Ok(Json(resources))
}

/// Reviewer listing, including pending submissions.
pub async fn list_all_resources(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filters): Query<ResourceFilters>,
) -> Result<Json<Vec<ResourceRecord>>, AppError> {
    require_role(&user, &[UserRole::Government, UserRole::Admin])?;
    let resources = ResourceService::list(&state.db, &user, &filters).await?;
    Ok(Json(resources))
}

pub async fn get_resource(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ResourceRecord>, AppError> {
    require_role(&user, &LIST_ROLES)?;
    let resource = ResourceService::get(&state.db, &user, id).await?;
    Ok(Json(resource))
}

pub async fn create_resource(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateResourceRequest>,
) -> Result<(StatusCode, Json<Resource>), AppError> {
    require_role(&user, &[UserRole::Resource])?;
    let resource = ResourceService::create(&state.db, user.id, &body).await?;
    Ok((StatusCode::CREATED, Json(resource)))
}

pub async fn update_resource(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateResourceRequest>,
) -> Result<Json<Resource>, AppError> {
    require_role(&user, &[UserRole::Resource])?;
    let resource = ResourceService::update_own(&state.db, user.id, id, &body).await?;
    Ok(Json(resource))
}

pub async fn delete_resource(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[UserRole::Resource])?;
    ResourceService::delete_own(&state.db, user.id, id).await?;
    Ok(Json(json!({ "message": "Resource removed" })))
}

pub async fn review_resource(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ReviewResourceRequest>,
) -> Result<Json<Resource>, AppError> {
    require_role(&user, &[UserRole::Government, UserRole::Admin])?;
    let resource = ResourceService::review(&state.db, &user.username, id, &body).await?;
    Ok(Json(resource))
}
