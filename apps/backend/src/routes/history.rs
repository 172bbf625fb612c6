//! Attempt history endpoints

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use exercise_core::catalog::DEFAULT_LIST_LIMIT;
use exercise_core::{ExerciseAttempt, HistoryStatistic, HistorySummary};

use crate::error::Result;
use crate::models::{HistoryQuery, HistoryStatisticParams, MAX_LIST_LIMIT};
use crate::routes::auth::AuthenticatedUser;
use crate::AppState;

/// GET /api/history
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<ExerciseAttempt>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);
    let attempts = state.exercises.history(auth.user_id, limit).await?;
    Ok(Json(attempts))
}

/// GET /api/history/info
pub async fn info(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<HistorySummary>> {
    let summary = state.exercises.history_summary(auth.user_id).await?;
    Ok(Json(summary))
}

/// GET /api/history/statistic
pub async fn statistic(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(params): Query<HistoryStatisticParams>,
) -> Result<Json<HistoryStatistic>> {
    let query = params.to_query()?;
    let statistic = state
        .exercises
        .history_statistic(auth.user_id, &query)
        .await?;
    Ok(Json(statistic))
}
