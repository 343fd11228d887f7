use std::sync::Arc;

use axum::{
    http::{header, Method},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{AllowHeaders, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carelink_api::{
    config::Config,
    db,
    middleware::auth::JwtSecret,
    routes,
    services::{ai::AiService, prompts::PromptStore},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let ai = Arc::new(AiService::new(&config)?);
    let prompts = Arc::new(PromptStore::load(&config.prompts_file)?);

    let state = AppState {
        db: pool,
        config: config.clone(),
        ai,
        prompts,
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_origin(tower_http::cors::Any);

    let jwt_secret = JwtSecret(config.jwt_secret.clone());

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        // Auth
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/me", get(routes::auth::me))
        .route("/auth/institution/invite-code", get(routes::auth::invite_code))
        .route("/auth/institution/members", get(routes::auth::members))
        // Children
        .route("/children", get(routes::children::list_children).post(routes::children::create_child))
        .route("/children/parent/my-children", get(routes::children::my_children))
        .route(
            "/children/{id}",
            get(routes::children::get_child)
                .put(routes::children::update_child)
                .delete(routes::children::delete_child),
        )
        // Parent directory
        .route("/parents", get(routes::parents::list_parents))
        // Attendance
        .route("/checkin", get(routes::checkin::list_checkins))
        .route("/checkin/today", get(routes::checkin::today))
        .route("/checkin/checkin", post(routes::checkin::checkin))
        .route("/checkin/checkout", post(routes::checkin::checkout))
        .route("/checkin/batch-checkin", post(routes::checkin::batch_checkin))
        .route("/checkin/absent", post(routes::checkin::mark_absent))
        // Safety checklist
        .route("/safety", get(routes::safety::list_checks).post(routes::safety::submit_check))
        .route("/safety/today", get(routes::safety::today))
        .route("/safety/stats", get(routes::safety::stats))
        // Activities
        .route("/activities", get(routes::activities::list_activities).post(routes::activities::create_activity))
        .route(
            "/activities/{id}",
            get(routes::activities::get_activity)
                .put(routes::activities::update_activity)
                .delete(routes::activities::delete_activity),
        )
        // Notifications
        .route(
            "/notifications",
            get(routes::notifications::list_notifications).post(routes::notifications::create_notification),
        )
        .route("/notifications/{id}", delete(routes::notifications::delete_notification))
        // Resources
        .route("/resources", get(routes::resources::list_resources).post(routes::resources::create_resource))
        .route("/resources/all", get(routes::resources::list_all_resources))
        .route(
            "/resources/{id}",
            get(routes::resources::get_resource)
                .put(routes::resources::update_resource)
                .delete(routes::resources::delete_resource),
        )
        .route("/resources/{id}/review", post(routes::resources::review_resource))
        // Statistics
        .route("/statistics/dashboard", get(routes::statistics::dashboard))
        .route("/statistics/activity-trend", get(routes::statistics::activity_trend))
        .route("/statistics/activity-types", get(routes::statistics::activity_types))
        .route("/statistics/resource-types", get(routes::statistics::resource_types))
        .route("/statistics/institution-ranking", get(routes::statistics::institution_ranking))
        // AI features
        .route("/ai/homework", post(routes::ai::homework))
        .route("/ai/learning-report", post(routes::ai::learning_report))
        .route("/ai/chat", post(routes::ai::chat))
        // Admin console
        .route("/admin/login", post(routes::admin::login))
        .route("/admin/statistics", get(routes::admin::statistics))
        .route("/admin/resources", get(routes::admin::list_resources))
        .route("/admin/resources/{id}/review", post(routes::admin::review_resource))
        .route("/admin/api-key", get(routes::admin::get_api_key).post(routes::admin::set_api_key))
        .route("/admin/api-key/test", post(routes::admin::test_api_key))
        .route("/admin/prompts", get(routes::admin::get_prompts))
        .route("/admin/prompts/reset", post(routes::admin::reset_prompts))
        .route("/admin/prompts/{feature}", put(routes::admin::update_prompt))
        .layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("carelink API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
