use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    models::{auth::AuthenticatedUser, user::ParentSummary},
    scope::require_institution,
    services::auth::AuthService,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct ParentSearch {
    pub search: Option<String>,
}

/// Parent directory used when linking a child to a parent account.
pub async fn list_parents(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ParentSearch>,
) -> Result<Json<Vec<ParentSummary>>, AppError> {
    require_institution(&user)?;
    let parents = AuthService::list_parents(&state.db, query.search.as_deref()).await?;
    Ok(Json(parents))
}
