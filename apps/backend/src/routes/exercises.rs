//! Exercise endpoints

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use exercise_core::{CheckResult, ExerciseKind, NewExercise, Prompt};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::AppState;

fn parse_kind(raw: &str) -> Result<ExerciseKind> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("Unknown exercise kind: {raw}")))
}

/// POST /api/exercises
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(payload): Json<NewExercise>,
) -> Result<(StatusCode, Json<CreateExerciseResponse>)> {
    state.admins.require(&auth)?;
    let created = state.exercises.create(payload).await?;
    let exercise = created.exercise;

    Ok((
        StatusCode::CREATED,
        Json(CreateExerciseResponse {
            id: exercise.id,
            kind: exercise.kind(),
            language: exercise.language,
            dropped_distractors: created.dropped_distractors,
        }),
    ))
}

/// GET /api/exercises
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListExercisesQuery>,
) -> Result<Json<Vec<ExerciseSummary>>> {
    let query = params.to_query()?;
    let exercises = state.exercises.list(&query).await?;

    Ok(Json(exercises.iter().map(ExerciseSummary::from).collect()))
}

/// GET /api/exercises/:kind/:id
pub async fn build(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<Json<Prompt>> {
    let kind = parse_kind(&kind)?;
    let prompt = state.exercises.build(kind, id).await?;
    Ok(Json(prompt))
}

/// POST /api/exercises/:kind/:id
pub async fn check(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(payload): Json<CheckRequest>,
) -> Result<Json<CheckResult>> {
    let kind = parse_kind(&kind)?;
    let (answer, request) = payload.into_parts()?;

    let result = state
        .exercises
        .check(kind, id, auth.user_id, answer, request)
        .await?;
    Ok(Json(result))
}

/// POST /api/exercises/:kind/:id/audio
///
/// The body is the raw WAV recording.
pub async fn check_audio(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path((kind, id)): Path<(String, Uuid)>,
    Query(params): Query<AudioCheckQuery>,
    body: Bytes,
) -> Result<Json<CheckResult>> {
    let kind = parse_kind(&kind)?;
    if !kind.is_speech() {
        return Err(ApiError::NotFound(format!(
            "{kind} exercises are not answered with audio"
        )));
    }
    if body.is_empty() {
        return Err(ApiError::BadRequest("Missing audio body".to_string()));
    }
    let request = params.into_request()?;

    let result = state
        .exercises
        .check_speech(kind, id, auth.user_id, body.to_vec(), request)
        .await?;
    Ok(Json(result))
}
