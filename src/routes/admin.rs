use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::admin::AdminPrincipal,
    models::{
        ai::{AiFeature, PromptConfig, PromptPatch},
        resource::{Resource, ResourceFilters, ResourceRecord, ReviewResourceRequest},
        user::UserRole,
    },
    services::{
        auth::AuthService, resources::ResourceService,
        statistics::{AdminStatistics, StatisticsService},
    },
    AppState,
};

/// Admin sessions are shorter-lived than user sessions.
const ADMIN_TOKEN_TTL_SECONDS: u64 = 12 * 3600;

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

/// The admin console authenticates against the configured credential, not
/// the users table.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<AdminLoginRequest>,
) -> Result<Json<Value>, AppError> {
    if body.username != state.config.admin_username
        || body.password != state.config.admin_password
    {
        return Err(AppError::InvalidCredentials);
    }

    let token = AuthService::generate_session_token(
        Uuid::nil(),
        &state.config.admin_username,
        UserRole::Admin,
        None,
        &state.config.jwt_secret,
        ADMIN_TOKEN_TTL_SECONDS,
    )?;

    Ok(Json(json!({
        "token": token,
        "user": {
            "username": state.config.admin_username,
            "role": "admin",
        },
    })))
}

pub async fn statistics(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
) -> Result<Json<AdminStatistics>, AppError> {
    let stats = StatisticsService::admin_statistics(&state.db).await?;
    Ok(Json(stats))
}

pub async fn list_resources(
    State(state): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    Query(filters): Query<ResourceFilters>,
) -> Result<Json<Vec<ResourceRecord>>, AppError> {
    let resources = ResourceService::list(&state.db, &admin, &filters).await?;
    Ok(Json(resources))
}

pub async fn review_resource(
    State(state): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    Path(id): Path<Uuid>,
    Json(body): Json<ReviewResourceRequest>,
) -> Result<Json<Resource>, AppError> {
    let resource = ResourceService::review(&state.db, &admin.username, id, &body).await?;
    Ok(Json(resource))
}

pub async fn get_api_key(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
) -> Json<Value> {
    let masked = state.ai.masked_key();
    Json(json!({
        "isSet": masked.is_some(),
        "masked": masked.unwrap_or_default(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetApiKeyRequest {
    pub api_key: String,
}

/// Replace the provider credential at runtime; in-flight requests keep the
/// value they already read.
pub async fn set_api_key(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
    Json(body): Json<SetApiKeyRequest>,
) -> Result<Json<Value>, AppError> {
    let key = body.api_key.trim();
    if key.is_empty() {
        return Err(AppError::validation("Provide a valid API key"));
    }
    state.ai.set_api_key(key.to_string());
    Ok(Json(json!({ "message": "API key updated" })))
}

pub async fn test_api_key(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
) -> Json<Value> {
    match state.ai.probe().await {
        Ok(()) => Json(json!({ "success": true, "message": "API key verified" })),
        Err(e) => Json(json!({ "success": false, "message": e.to_string() })),
    }
}

pub async fn get_prompts(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
) -> Json<HashMap<AiFeature, PromptConfig>> {
    Json(state.prompts.all())
}

pub async fn update_prompt(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
    Path(feature): Path<String>,
    Json(patch): Json<PromptPatch>,
) -> Result<Json<Value>, AppError> {
    let feature: AiFeature = feature
        .parse()
        .map_err(|_| AppError::validation(format!("Unknown AI feature: {feature}")))?;
    let prompt = state.prompts.update(feature, &patch)?;
    Ok(Json(json!({ "message": "Prompt updated", "prompt": prompt })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPromptsRequest {
    #[serde(rename = "type")]
    pub feature: Option<String>,
}

pub async fn reset_prompts(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
    Json(body): Json<ResetPromptsRequest>,
) -> Result<Json<Value>, AppError> {
    let feature = match body.feature {
        Some(raw) => Some(
            raw.parse::<AiFeature>()
                .map_err(|_| AppError::validation(format!("Unknown AI feature: {raw}")))?,
        ),
        None => None,
    };
    let prompts = state.prompts.reset(feature)?;
    Ok(Json(json!({ "message": "Prompts reset", "prompts": prompts })))
}
