pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use exercise_core::{
    AttemptHistory, BuilderRegistry, ExerciseCatalog, InMemoryCatalog, InMemoryHistory,
    Transcriber,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;
use crate::routes::auth::AdminPolicy;
use crate::services::{DisabledTranscriber, ExerciseService, HttpTranscriber, TimeoutTranscriber};

/// Largest accepted audio upload.
pub const MAX_AUDIO_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub exercises: Arc<ExerciseService>,
    pub admins: Arc<AdminPolicy>,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn ExerciseCatalog>,
        history: Arc<dyn AttemptHistory>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        Self {
            exercises: Arc::new(ExerciseService::new(
                catalog,
                history,
                transcriber,
                BuilderRegistry::standard(),
            )),
            admins: Arc::new(AdminPolicy::Open),
        }
    }

    /// Restrict exercise creation to `admins`.
    pub fn with_admins(mut self, admins: AdminPolicy) -> Self {
        self.admins = Arc::new(admins);
        self
    }
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        // Exercise routes
        .route(
            "/api/exercises",
            get(routes::exercises::list).post(routes::exercises::create),
        )
        .route(
            "/api/exercises/:kind/:id",
            get(routes::exercises::build).post(routes::exercises::check),
        )
        .route(
            "/api/exercises/:kind/:id/audio",
            post(routes::exercises::check_audio).layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES)),
        )
        // History routes
        .route("/api/history", get(routes::history::list))
        .route("/api/history/info", get(routes::history::info))
        .route("/api/history/statistic", get(routes::history::statistic))
        .layer(middleware::from_fn(routes::auth::auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .with_state(state)
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let (catalog, history): (Arc<dyn ExerciseCatalog>, Arc<dyn AttemptHistory>) =
        match &config.database_url {
            Some(database_url) => {
                tracing::info!("Connecting to database...");
                let db = Arc::new(Database::connect(database_url).await?);

                tracing::info!("Running migrations...");
                db.run_migrations().await?;

                (
                    db.clone() as Arc<dyn ExerciseCatalog>,
                    db as Arc<dyn AttemptHistory>,
                )
            }
            None => {
                tracing::warn!("DATABASE_URL not set, exercises are kept in memory");
                (
                    Arc::new(InMemoryCatalog::new()) as Arc<dyn ExerciseCatalog>,
                    Arc::new(InMemoryHistory::new()) as Arc<dyn AttemptHistory>,
                )
            }
        };

    let transcriber: Arc<dyn Transcriber> = match &config.transcriber_url {
        Some(url) => {
            tracing::info!(%url, "Using HTTP transcriber");
            let http = HttpTranscriber::new(
                url.clone(),
                config.transcriber_api_key.clone(),
                config.transcribe_timeout,
            )?;
            Arc::new(TimeoutTranscriber::new(http, config.transcribe_timeout))
        }
        None => {
            tracing::warn!("TRANSCRIBER_URL not set, speech exercises cannot be checked");
            Arc::new(DisabledTranscriber)
        }
    };

    let admins = match &config.admin_user_ids {
        Some(ids) => {
            tracing::info!(count = ids.len(), "Exercise creation restricted to admins");
            AdminPolicy::only(ids.iter().copied())
        }
        None => {
            tracing::warn!("ADMIN_USER_IDS not set, any user may create exercises");
            AdminPolicy::Open
        }
    };

    let state = AppState::new(catalog, history, transcriber).with_admins(admins);

    let app = build_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
