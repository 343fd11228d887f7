use axum::{extract::State, http::StatusCode, Json};
use serde_json::Value;

use crate::{
    error::AppError,
    middleware::auth::require_role,
    models::{
        auth::AuthenticatedUser,
        institution::{InviteCodeResponse, MemberProfile},
        user::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, UserRole},
    },
    services::auth::AuthService,
    AppState,
};

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let response = AuthService::register(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response = AuthService::login(
        &state.db,
        &body.username,
        &body.password,
        &state.config.jwt_secret,
        state.config.jwt_expiry_seconds,
    )
    .await?;
    Ok(Json(response))
}

pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, AppError> {
    let (profile, institution) = AuthService::me(&state.db, user.id).await?;
    let mut body = serde_json::to_value(profile).map_err(|e| AppError::Internal(e.into()))?;
    if let Some(institution) = institution {
        body["institution"] =
            serde_json::to_value(institution).map_err(|e| AppError::Internal(e.into()))?;
    }
    Ok(Json(body))
}

pub async fn invite_code(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<InviteCodeResponse>, AppError> {
    require_role(&user, &[UserRole::Institution])?;
    let response = AuthService::invite_code(&state.db, &user).await?;
    Ok(Json(response))
}

pub async fn members(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<MemberProfile>>, AppError> {
    require_role(&user, &[UserRole::Institution])?;
    let members = AuthService::members(&state.db, &user).await?;
    Ok(Json(members))
}
