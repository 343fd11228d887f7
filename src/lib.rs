// Library exports for the API binary and tests
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod scope;
pub mod services;

use std::sync::Arc;

use sqlx::PgPool;

use config::Config;
use services::ai::AiService;
use services::prompts::PromptStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub ai: Arc<AiService>,
    pub prompts: Arc<PromptStore>,
}
