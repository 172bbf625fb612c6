//! Common test utilities and fixtures for integration tests.
//!
//! This module provides shared test infrastructure including:
//! - TestContext wiring the router to in-memory stores or PostgreSQL
//! - A scripted transcriber standing in for the speech service
//! - Authentication helpers
//!
//! # Requirements
//! Tests built with `TestContext::with_database` need a PostgreSQL database
//! (set DATABASE_URL env var) and are ignored by default.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderValue;
use axum::Router;
use axum_test::{TestRequest, TestServer};
use exercise_core::{
    AttemptHistory, AudioClip, Exercise, ExerciseCatalog, InMemoryCatalog, InMemoryHistory,
    Language, NewExercise, Transcriber, TranscriptionError,
};
use uuid::Uuid;

use exercise_backend::db::Database;
use exercise_backend::routes::auth::AdminPolicy;
use exercise_backend::{build_router, AppState};

/// Transcriber returning a configurable reply and counting calls.
pub struct ScriptedTranscriber {
    reply: Mutex<Result<String, TranscriptionError>>,
    calls: AtomicUsize,
}

impl ScriptedTranscriber {
    pub fn new() -> Self {
        Self {
            reply: Mutex::new(Ok(String::new())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn reply_with(&self, reply: Result<&str, TranscriptionError>) {
        *self.reply.lock().unwrap() = reply.map(String::from);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(
        &self,
        _audio: &AudioClip,
        _vocabulary: &[String],
        _language: Language,
    ) -> Result<String, TranscriptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.lock().unwrap().clone()
    }
}

/// Test context containing the stores behind a router.
pub struct TestContext {
    pub catalog: Arc<dyn ExerciseCatalog>,
    pub history: Arc<dyn AttemptHistory>,
    pub transcriber: Arc<ScriptedTranscriber>,
    pub db: Option<Arc<Database>>,
    state: AppState,
}

impl TestContext {
    /// Context backed by in-memory stores.
    pub fn new() -> Self {
        Self::from_stores(
            Arc::new(InMemoryCatalog::new()),
            Arc::new(InMemoryHistory::new()),
            None,
        )
    }

    /// Context backed by PostgreSQL.
    ///
    /// # Panics
    /// Panics if DATABASE_URL is not set or database connection fails.
    pub async fn with_database() -> Self {
        dotenvy::dotenv().ok();

        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");

        let db = Database::connect(&database_url)
            .await
            .expect("Failed to connect to test database");

        db.run_migrations()
            .await
            .expect("Failed to run migrations");

        let db = Arc::new(db);
        Self::from_stores(db.clone(), db.clone(), Some(db))
    }

    fn from_stores(
        catalog: Arc<dyn ExerciseCatalog>,
        history: Arc<dyn AttemptHistory>,
        db: Option<Arc<Database>>,
    ) -> Self {
        let transcriber = Arc::new(ScriptedTranscriber::new());
        let state = AppState::new(catalog.clone(), history.clone(), transcriber.clone());

        Self {
            catalog,
            history,
            transcriber,
            db,
            state,
        }
    }

    /// Only `admins` may create exercises.
    pub fn with_admins(mut self, admins: &[Uuid]) -> Self {
        self.state = self
            .state
            .with_admins(AdminPolicy::only(admins.iter().copied()));
        self
    }

    /// Get the router for use with axum-test.
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router()).unwrap()
    }

    /// Validate and store an exercise without going through the API.
    pub async fn seed(&self, new: NewExercise) -> Exercise {
        let created = new
            .into_exercise(&mut rand::thread_rng())
            .expect("fixture exercise must be valid");
        self.catalog
            .insert(&created.exercise)
            .await
            .expect("Failed to seed exercise");
        created.exercise
    }

    /// Format authorization header value.
    pub fn auth_header_value(user_id: Uuid) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", user_id)).unwrap()
    }

    /// Clean up rows created for an exercise.
    pub async fn cleanup_exercise(&self, exercise_id: Uuid) {
        let Some(db) = &self.db else { return };

        let _ = sqlx::query("DELETE FROM exercise_attempts WHERE exercise_id = $1")
            .bind(exercise_id)
            .execute(db.pool())
            .await;

        let _ = sqlx::query("DELETE FROM exercises WHERE id = $1")
            .bind(exercise_id)
            .execute(db.pool())
            .await;
    }
}

/// Attach the bearer token of `user_id`.
pub fn authorized(request: TestRequest, user_id: Uuid) -> TestRequest {
    request.add_header(AUTHORIZATION, TestContext::auth_header_value(user_id))
}
