//! In-memory catalog and history, used when no database is configured and in
//! tests.

use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::catalog::{
    AttemptHistory, CatalogResult, ExerciseAttempt, ExerciseCatalog, ExerciseQuery,
    HistoryStatistic, HistorySummary, StatisticQuery,
};
use crate::error::CatalogError;
use crate::exercise::{Exercise, ExerciseKind, Language, TermId};

fn poisoned() -> CatalogError {
    CatalogError::Storage("lock poisoned".to_string())
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    exercises: RwLock<Vec<Exercise>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExerciseCatalog for InMemoryCatalog {
    async fn get(&self, id: Uuid, kind: ExerciseKind) -> CatalogResult<Option<Exercise>> {
        let exercises = self.exercises.read().map_err(|_| poisoned())?;
        Ok(exercises
            .iter()
            .find(|e| e.id == id && e.kind() == kind)
            .cloned())
    }

    async fn find_by_reference(
        &self,
        language: Language,
        term_reference: TermId,
        kind: ExerciseKind,
    ) -> CatalogResult<Option<Exercise>> {
        let exercises = self.exercises.read().map_err(|_| poisoned())?;
        Ok(exercises
            .iter()
            .find(|e| {
                e.language == language && e.term_reference == term_reference && e.kind() == kind
            })
            .cloned())
    }

    async fn insert(&self, exercise: &Exercise) -> CatalogResult<()> {
        let mut exercises = self.exercises.write().map_err(|_| poisoned())?;
        let duplicate = exercises.iter().any(|e| {
            e.language == exercise.language
                && e.term_reference == exercise.term_reference
                && e.kind() == exercise.kind()
        });
        if duplicate {
            return Err(CatalogError::Duplicate {
                term_reference: exercise.term_reference,
                kind: exercise.kind(),
            });
        }
        exercises.push(exercise.clone());
        Ok(())
    }

    async fn list(&self, query: &ExerciseQuery) -> CatalogResult<Vec<Exercise>> {
        let exercises = self.exercises.read().map_err(|_| poisoned())?;
        let mut matching: Vec<Exercise> = exercises
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            query
                .order_key(a)
                .total_cmp(&query.order_key(b))
                .then_with(|| a.id.cmp(&b.id))
        });
        matching.truncate(query.limit);
        Ok(matching)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryHistory {
    attempts: RwLock<Vec<ExerciseAttempt>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttemptHistory for InMemoryHistory {
    async fn append(&self, attempt: ExerciseAttempt) -> CatalogResult<()> {
        self.attempts
            .write()
            .map_err(|_| poisoned())?
            .push(attempt);
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> CatalogResult<Vec<ExerciseAttempt>> {
        let attempts = self.attempts.read().map_err(|_| poisoned())?;
        Ok(attempts
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn summary(&self, user_id: Uuid) -> CatalogResult<HistorySummary> {
        let attempts = self.attempts.read().map_err(|_| poisoned())?;
        Ok(HistorySummary::from_newest_first(
            attempts
                .iter()
                .rev()
                .filter(|a| a.user_id == user_id)
                .map(|a| &a.correct),
        ))
    }

    async fn statistic(
        &self,
        user_id: Uuid,
        query: &StatisticQuery,
    ) -> CatalogResult<HistoryStatistic> {
        let attempts = self.attempts.read().map_err(|_| poisoned())?;
        Ok(HistoryStatistic::tally(
            attempts
                .iter()
                .filter(|a| a.user_id == user_id && query.matches(a))
                .map(|a| &a.correct),
        ))
    }
}
