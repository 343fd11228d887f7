use axum::{
    extract::{Path, State},
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
        notification::{CreateNotificationRequest, Notification, NotificationRecord},
        user::UserRole,
    },
    scope::{require_institution, tenant_read_scope},
    services::notifications::NotificationService,
    AppState,
};

pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<NotificationRecord>>, AppError> {
    require_role(
        &user,
        &[
            UserRole::Institution,
            UserRole::Parent,
            UserRole::Government,
            UserRole::Admin,
        ],
    )?;
    let scope = tenant_read_scope(&state.db, &user).await?;
    let public_only = user.role == UserRole::Parent;
    let notifications = NotificationService::list(&state.db, &scope, public_only).await?;
    Ok(Json(notifications))
}

pub async fn create_notification(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    let institution_id = require_institution(&user)?;
    let notification =
        NotificationService::create(&state.db, institution_id, user.id, &body).await?;
    Ok((StatusCode::CREATED, Json(notification)))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let institution_id = require_institution(&user)?;
    NotificationService::delete(&state.db, institution_id, id).await?;
    Ok(Json(json!({ "message": "Notification removed" })))
}
