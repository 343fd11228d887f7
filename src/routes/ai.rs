use axum::{extract::State, Json};

use crate::{
    error::AppError,
    middleware::auth::require_role,
    models::{
        ai::{AiFeature, AiReply, ChatRequest, HomeworkRequest, LearningReportRequest},
        auth::AuthenticatedUser,
        user::UserRole,
    },
    services::ai::{chat_messages, homework_messages, learning_report_messages},
    AppState,
};

pub async fn homework(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<HomeworkRequest>,
) -> Result<Json<AiReply>, AppError> {
    require_role(&user, &[UserRole::Student])?;
    let config = state.prompts.get(AiFeature::Homework);
    let messages = homework_messages(&config, &body)?;
    let reply = state
        .ai
        .chat_completion(messages, config.max_tokens, config.temperature)
        .await?;
    Ok(Json(AiReply { reply }))
}

pub async fn learning_report(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<LearningReportRequest>,
) -> Result<Json<AiReply>, AppError> {
    require_role(&user, &[UserRole::Student])?;
    let config = state.prompts.get(AiFeature::LearningReport);
    let messages = learning_report_messages(&config, &body)?;
    let reply = state
        .ai
        .chat_completion(messages, config.max_tokens, config.temperature)
        .await?;
    Ok(Json(AiReply { reply }))
}

pub async fn chat(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChatRequest>,
) -> Result<Json<AiReply>, AppError> {
    require_role(&user, &[UserRole::Student])?;
    let config = state.prompts.get(AiFeature::Chat);
    let messages = chat_messages(&config, &body.messages)?;
    let reply = state
        .ai
        .chat_completion(messages, config.max_tokens, config.temperature)
        .await?;
    Ok(Json(AiReply { reply }))
}
