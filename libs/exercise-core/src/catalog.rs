//! Storage seams: the exercise catalog and the attempt history.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::CatalogError;
use crate::exercise::{Exercise, ExerciseKind, Language, Level, TermId};

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Default page size for listings.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Filters for [`ExerciseCatalog::list`]. Empty filters match everything.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseQuery {
    pub languages: Vec<Language>,
    pub kinds: Vec<ExerciseKind>,
    pub levels: Vec<Level>,
    /// Exercises are ordered by `random_score mod seed`, so the same seed
    /// reproduces the same order. A seed of zero orders by `random_score`.
    pub seed: f64,
    pub limit: usize,
}

impl Default for ExerciseQuery {
    fn default() -> Self {
        Self {
            languages: Vec::new(),
            kinds: Vec::new(),
            levels: Vec::new(),
            seed: 0.0,
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl ExerciseQuery {
    pub fn matches(&self, exercise: &Exercise) -> bool {
        (self.languages.is_empty() || self.languages.contains(&exercise.language))
            && (self.kinds.is_empty() || self.kinds.contains(&exercise.kind()))
            && (self.levels.is_empty()
                || exercise
                    .level
                    .is_some_and(|level| self.levels.contains(&level)))
    }

    /// Sort key of `exercise` under this query's seed.
    pub fn order_key(&self, exercise: &Exercise) -> f64 {
        if self.seed > 0.0 {
            exercise.random_score % self.seed
        } else {
            exercise.random_score
        }
    }
}

/// Exercise storage.
#[async_trait]
pub trait ExerciseCatalog: Send + Sync {
    /// The exercise with `id`, if it exists and is of `kind`.
    async fn get(&self, id: Uuid, kind: ExerciseKind) -> CatalogResult<Option<Exercise>>;

    async fn find_by_reference(
        &self,
        language: Language,
        term_reference: TermId,
        kind: ExerciseKind,
    ) -> CatalogResult<Option<Exercise>>;

    /// Store a new exercise. Fails with [`CatalogError::Duplicate`] when one
    /// already exists for the same language, term and kind.
    async fn insert(&self, exercise: &Exercise) -> CatalogResult<()>;

    async fn list(&self, query: &ExerciseQuery) -> CatalogResult<Vec<Exercise>>;
}

/// One graded attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseAttempt {
    pub id: Uuid,
    pub exercise_id: Uuid,
    pub kind: ExerciseKind,
    /// Language and level of the exercise when it was attempted.
    pub language: Language,
    pub level: Option<Level>,
    pub user_id: Uuid,
    pub correct: bool,
    /// Submitted answer merged with the grading result.
    pub response: Value,
    pub request: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub correct: u64,
    pub incorrect: u64,
    /// Consecutive correct attempts, counted back from the latest.
    pub streak: u64,
}

impl HistorySummary {
    /// Summarize attempts given newest first.
    pub fn from_newest_first<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = &'a bool>,
    {
        let mut summary = Self::default();
        let mut streak_open = true;
        for &correct in outcomes {
            if correct {
                summary.correct += 1;
                if streak_open {
                    summary.streak += 1;
                }
            } else {
                summary.incorrect += 1;
                streak_open = false;
            }
        }
        summary
    }
}

/// Filters for [`AttemptHistory::statistic`]. Both dates are inclusive and
/// compared against the UTC day an attempt was made.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub kind: Option<ExerciseKind>,
    pub level: Option<Level>,
    pub language: Option<Language>,
}

impl StatisticQuery {
    /// Query over `start_date..=end_date` with no other filter. Fails when the
    /// range ends before it starts.
    pub fn between(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, String> {
        if end_date < start_date {
            return Err(format!(
                "end_date {end_date} is before start_date {start_date}"
            ));
        }
        Ok(Self {
            start_date,
            end_date,
            kind: None,
            level: None,
            language: None,
        })
    }

    pub fn matches(&self, attempt: &ExerciseAttempt) -> bool {
        let day = attempt.created_at.date_naive();
        (self.start_date..=self.end_date).contains(&day)
            && self.kind.map_or(true, |kind| kind == attempt.kind)
            && self.level.map_or(true, |level| attempt.level == Some(level))
            && self
                .language
                .map_or(true, |language| language == attempt.language)
    }
}

/// Correct and incorrect attempt counts over a [`StatisticQuery`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStatistic {
    pub correct: u64,
    pub incorrect: u64,
}

impl HistoryStatistic {
    pub fn tally<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = &'a bool>,
    {
        outcomes
            .into_iter()
            .fold(Self::default(), |mut statistic, &correct| {
                if correct {
                    statistic.correct += 1;
                } else {
                    statistic.incorrect += 1;
                }
                statistic
            })
    }
}

/// Append-only attempt log.
#[async_trait]
pub trait AttemptHistory: Send + Sync {
    async fn append(&self, attempt: ExerciseAttempt) -> CatalogResult<()>;

    /// The user's attempts, newest first.
    async fn list_for_user(&self, user_id: Uuid, limit: usize)
        -> CatalogResult<Vec<ExerciseAttempt>>;

    async fn summary(&self, user_id: Uuid) -> CatalogResult<HistorySummary>;

    /// Outcome counts of the user's attempts matching `query`.
    async fn statistic(
        &self,
        user_id: Uuid,
        query: &StatisticQuery,
    ) -> CatalogResult<HistoryStatistic>;
}
