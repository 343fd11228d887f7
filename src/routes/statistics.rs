use axum::{extract::State, Json};

use crate::{
    error::AppError,
    middleware::auth::require_role,
    models::{auth::AuthenticatedUser, user::UserRole},
    services::statistics::{
        ActivityTrendPoint, DashboardStats, InstitutionRanking, StatisticsService, TypeCount,
    },
    AppState,
};

pub async fn dashboard(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<DashboardStats>, AppError> {
    let stats = StatisticsService::dashboard(&state.db).await?;
    Ok(Json(stats))
}

pub async fn activity_trend(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<ActivityTrendPoint>>, AppError> {
    let trend = StatisticsService::activity_trend(&state.db).await?;
    Ok(Json(trend))
}

pub async fn activity_types(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<TypeCount>>, AppError> {
    let types = StatisticsService::activity_types(&state.db).await?;
    Ok(Json(types))
}

pub async fn resource_types(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<TypeCount>>, AppError> {
    let types = StatisticsService::resource_types(&state.db).await?;
    Ok(Json(types))
}

pub async fn institution_ranking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<InstitutionRanking>>, AppError> {
    require_role(&user, &[UserRole::Government, UserRole::Admin])?;
    let ranking = StatisticsService::institution_ranking(&state.db).await?;
    Ok(Json(ranking))
}
