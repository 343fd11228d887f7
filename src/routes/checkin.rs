use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::AppError,
    models::{
        auth::AuthenticatedUser,
        checkin::{
            AbsentRequest, BatchCheckinRequest, BatchCheckinResponse, CheckinFilters,
            CheckinRecord, CheckinRequest, CheckoutRequest, TodayAttendance,
        },
    },
    scope::require_institution,
    services::checkin::CheckinService,
    AppState,
};

pub async fn list_checkins(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filters): Query<CheckinFilters>,
) -> Result<Json<Vec<CheckinRecord>>, AppError> {
    let institution_id = require_institution(&user)?;
    let records = CheckinService::list(&state.db, institution_id, &filters).await?;
    Ok(Json(records))
}

pub async fn today(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<TodayAttendance>>, AppError> {
    let institution_id = require_institution(&user)?;
    let board = CheckinService::today(&state.db, institution_id).await?;
    Ok(Json(board))
}

pub async fn checkin(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CheckinRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let institution_id = require_institution(&user)?;
    CheckinService::checkin(&state.db, institution_id, &body).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "Checked in" }))))
}

pub async fn checkout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CheckoutRequest>,
) -> Result<Json<Value>, AppError> {
    let institution_id = require_institution(&user)?;
    CheckinService::checkout(&state.db, institution_id, &body).await?;
    Ok(Json(json!({ "message": "Checked out" })))
}

pub async fn batch_checkin(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<BatchCheckinRequest>,
) -> Result<Json<BatchCheckinResponse>, AppError> {
    let institution_id = require_institution(&user)?;
    let outcome = CheckinService::batch_checkin(&state.db, institution_id, &body).await?;
    Ok(Json(outcome))
}

pub async fn mark_absent(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<AbsentRequest>,
) -> Result<Json<Value>, AppError> {
    let institution_id = require_institution(&user)?;
    CheckinService::mark_absent(&state.db, institution_id, &body).await?;
    Ok(Json(json!({ "message": "Marked absent" })))
}
