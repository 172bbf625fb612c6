//! Exercise use cases shared by the HTTP handlers

use std::sync::Arc;

use exercise_core::{
    AttemptHistory, BuilderRegistry, CatalogError, CheckResult, CreatedExercise, Exercise,
    ExerciseAttempt, ExerciseCatalog, ExerciseError, ExerciseKind, ExerciseQuery,
    ExerciseSession, HistoryStatistic, HistorySummary, NewExercise, Prompt, Result,
    StatisticQuery, Transcriber,
};
use serde_json::Value;
use uuid::Uuid;

/// Ties the builder registry to the storage and transcription backends.
pub struct ExerciseService {
    catalog: Arc<dyn ExerciseCatalog>,
    history: Arc<dyn AttemptHistory>,
    transcriber: Arc<dyn Transcriber>,
    registry: BuilderRegistry,
}

impl ExerciseService {
    pub fn new(
        catalog: Arc<dyn ExerciseCatalog>,
        history: Arc<dyn AttemptHistory>,
        transcriber: Arc<dyn Transcriber>,
        registry: BuilderRegistry,
    ) -> Self {
        Self {
            catalog,
            history,
            transcriber,
            registry,
        }
    }

    /// Validate, repair and store a new exercise.
    pub async fn create(&self, new: NewExercise) -> Result<CreatedExercise> {
        let created = new.into_exercise(&mut rand::thread_rng())?;
        let exercise = &created.exercise;

        let existing = self
            .catalog
            .find_by_reference(exercise.language, exercise.term_reference, exercise.kind())
            .await?;
        if existing.is_some() {
            return Err(CatalogError::Duplicate {
                term_reference: exercise.term_reference,
                kind: exercise.kind(),
            }
            .into());
        }

        self.catalog.insert(exercise).await?;
        if !created.dropped_distractors.is_empty() {
            tracing::debug!(
                exercise_id = %exercise.id,
                dropped = ?created.dropped_distractors,
                "dropped overlapping distractors"
            );
        }
        tracing::info!(exercise_id = %exercise.id, kind = %exercise.kind(), "exercise created");

        Ok(created)
    }

    pub async fn list(&self, query: &ExerciseQuery) -> Result<Vec<Exercise>> {
        Ok(self.catalog.list(query).await?)
    }

    async fn session(&self, kind: ExerciseKind, id: Uuid) -> Result<ExerciseSession<'_>> {
        let exercise = self
            .catalog
            .get(id, kind)
            .await?
            .ok_or(ExerciseError::NotFound { id, kind })?;
        self.registry.bind(exercise, kind)
    }

    /// Randomized prompt of one exercise.
    pub async fn build(&self, kind: ExerciseKind, id: Uuid) -> Result<Prompt> {
        let session = self.session(kind, id).await?;
        session.build(&mut rand::thread_rng())
    }

    /// Grade a structured answer and record the attempt.
    pub async fn check(
        &self,
        kind: ExerciseKind,
        id: Uuid,
        user_id: Uuid,
        answer: Value,
        request: Value,
    ) -> Result<CheckResult> {
        let session = self.session(kind, id).await?;
        let result = session
            .check(self.history.as_ref(), user_id, answer, request)
            .await?;
        tracing::debug!(exercise_id = %id, %kind, correct = result.correct, "answer checked");
        Ok(result)
    }

    /// Grade a recorded answer and record the attempt.
    pub async fn check_speech(
        &self,
        kind: ExerciseKind,
        id: Uuid,
        user_id: Uuid,
        audio: Vec<u8>,
        request: Value,
    ) -> Result<CheckResult> {
        let session = self.session(kind, id).await?;
        let result = session
            .check_speech(
                self.transcriber.as_ref(),
                self.history.as_ref(),
                user_id,
                audio,
                request,
            )
            .await;

        match &result {
            Ok(result) => {
                tracing::debug!(exercise_id = %id, %kind, correct = result.correct, "speech checked")
            }
            Err(err) => tracing::warn!(exercise_id = %id, %kind, error = %err, "speech check failed"),
        }
        result
    }

    pub async fn history(&self, user_id: Uuid, limit: usize) -> Result<Vec<ExerciseAttempt>> {
        Ok(self.history.list_for_user(user_id, limit).await?)
    }

    pub async fn history_summary(&self, user_id: Uuid) -> Result<HistorySummary> {
        Ok(self.history.summary(user_id).await?)
    }

    pub async fn history_statistic(
        &self,
        user_id: Uuid,
        query: &StatisticQuery,
    ) -> Result<HistoryStatistic> {
        Ok(self.history.statistic(user_id, query).await?)
    }
}
