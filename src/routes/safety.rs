use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppError,
    models::{
        auth::AuthenticatedUser,
        safety::{
            SafetyCheck, SafetyCheckRecord, SafetyFilters, SafetyStats,
            SubmitSafetyCheckRequest, TodaySafetyResponse,
        },
    },
    scope::require_institution,
    services::safety::SafetyService,
    AppState,
};

pub async fn list_checks(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filters): Query<SafetyFilters>,
) -> Result<Json<Vec<SafetyCheckRecord>>, AppError> {
    let institution_id = require_institution(&user)?;
    let records = SafetyService::list(&state.db, institution_id, &filters).await?;
    Ok(Json(records))
}

pub async fn today(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<TodaySafetyResponse>, AppError> {
    let institution_id = require_institution(&user)?;
    let response = SafetyService::today(&state.db, institution_id).await?;
    Ok(Json(response))
}

pub async fn submit_check(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<SubmitSafetyCheckRequest>,
) -> Result<Json<SafetyCheck>, AppError> {
    let institution_id = require_institution(&user)?;
    let check = SafetyService::submit(&state.db, institution_id, user.id, &body).await?;
    Ok(Json(check))
}

pub async fn stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<SafetyStats>, AppError> {
    let institution_id = require_institution(&user)?;
    let stats = SafetyService::stats(&state.db, institution_id).await?;
    Ok(Json(stats))
}
