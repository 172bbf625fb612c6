//! Database models and API types

use chrono::{DateTime, NaiveDate, Utc};
use exercise_core::{
    CatalogError, Exercise, ExerciseAttempt, ExerciseBody, ExerciseKind, ExerciseQuery, Language,
    Level, StatisticQuery, TermId,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{ApiError, Result};

// === Database Entity Types ===

/// Exercise stored in PostgreSQL. The kind payload lives in `body`.
#[derive(Debug, Clone, FromRow)]
pub struct DbExercise {
    pub id: Uuid,
    pub language: String,
    pub term_reference: i64,
    pub kind: String,
    pub level: Option<String>,
    pub random_score: f64,
    pub body: Json<ExerciseBody>,
    pub created_at: DateTime<Utc>,
}

impl DbExercise {
    pub fn into_exercise(self) -> std::result::Result<Exercise, CatalogError> {
        let corrupt = |what: String| CatalogError::Storage(format!("exercise {}: {what}", self.id));

        let language: Language = self.language.parse().map_err(corrupt)?;
        let level = self
            .level
            .as_deref()
            .map(str::parse::<Level>)
            .transpose()
            .map_err(corrupt)?;
        let body = self.body.0;
        if body.kind().as_str() != self.kind {
            return Err(corrupt(format!(
                "kind column {} disagrees with body {}",
                self.kind,
                body.kind()
            )));
        }

        Ok(Exercise {
            id: self.id,
            language,
            term_reference: TermId(self.term_reference),
            level,
            random_score: self.random_score,
            body,
        })
    }
}

/// Attempt stored in PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct DbAttempt {
    pub id: Uuid,
    pub exercise_id: Uuid,
    pub kind: String,
    pub language: String,
    pub level: Option<String>,
    pub user_id: Uuid,
    pub correct: bool,
    pub response: Json<Value>,
    pub request: Json<Value>,
    pub created_at: DateTime<Utc>,
}

impl DbAttempt {
    pub fn into_attempt(self) -> std::result::Result<ExerciseAttempt, CatalogError> {
        let corrupt = |what: String| CatalogError::Storage(format!("attempt {}: {what}", self.id));

        let kind: ExerciseKind = self.kind.parse().map_err(corrupt)?;
        let language: Language = self.language.parse().map_err(corrupt)?;
        let level = self
            .level
            .as_deref()
            .map(str::parse::<Level>)
            .transpose()
            .map_err(corrupt)?;

        Ok(ExerciseAttempt {
            id: self.id,
            exercise_id: self.exercise_id,
            kind,
            language,
            level,
            user_id: self.user_id,
            correct: self.correct,
            response: self.response.0,
            request: self.request.0,
            created_at: self.created_at,
        })
    }
}

// === API Request/Response Types ===

/// Response body of POST /api/exercises
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateExerciseResponse {
    pub id: Uuid,
    pub kind: ExerciseKind,
    pub language: Language,
    pub dropped_distractors: Vec<String>,
}

/// Query parameters of GET /api/exercises. Filters take comma-separated values.
#[derive(Debug, Default, Deserialize)]
pub struct ListExercisesQuery {
    pub language: Option<String>,
    pub kind: Option<String>,
    pub level: Option<String>,
    pub seed: Option<f64>,
    pub limit: Option<usize>,
}

/// Largest page GET /api/exercises returns.
pub const MAX_LIST_LIMIT: usize = 200;

fn parse_list<T>(raw: Option<&str>) -> Result<Vec<T>>
where
    T: std::str::FromStr<Err = String>,
{
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| item.parse::<T>().map_err(ApiError::BadRequest))
            .collect()
    })
    .unwrap_or_else(|| Ok(Vec::new()))
}

impl ListExercisesQuery {
    /// Catalog query for these parameters. A missing seed draws a fresh one.
    pub fn to_query(&self) -> Result<ExerciseQuery> {
        let seed = match self.seed {
            Some(seed) if (0.0..=1.0).contains(&seed) => seed,
            Some(seed) => {
                return Err(ApiError::BadRequest(format!(
                    "seed must be between 0 and 1, got {seed}"
                )))
            }
            None => rand::random::<f64>(),
        };
        let defaults = ExerciseQuery::default();

        Ok(ExerciseQuery {
            languages: parse_list(self.language.as_deref())?,
            kinds: parse_list(self.kind.as_deref())?,
            levels: parse_list(self.level.as_deref())?,
            seed,
            limit: self.limit.unwrap_or(defaults.limit).min(MAX_LIST_LIMIT),
        })
    }
}

/// Entry of GET /api/exercises
#[derive(Debug, Serialize, Deserialize)]
pub struct ExerciseSummary {
    pub id: Uuid,
    pub kind: ExerciseKind,
    pub language: Language,
    pub url: String,
}

impl From<&Exercise> for ExerciseSummary {
    fn from(exercise: &Exercise) -> Self {
        Self {
            id: exercise.id,
            kind: exercise.kind(),
            language: exercise.language,
            url: format!("/api/exercises/{}/{}", exercise.kind(), exercise.id),
        }
    }
}

/// Body of POST /api/exercises/:kind/:id
///
/// Everything besides `answer` is kept as request metadata in the history.
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub time_to_answer: f64,
    pub answer: Value,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

fn check_time_to_answer(time_to_answer: f64) -> Result<()> {
    if time_to_answer > 0.0 && time_to_answer.is_finite() {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "time_to_answer must be positive, got {time_to_answer}"
        )))
    }
}

impl CheckRequest {
    /// Split into the answer and the metadata recorded with the attempt.
    pub fn into_parts(self) -> Result<(Value, Value)> {
        check_time_to_answer(self.time_to_answer)?;
        let mut request = self.metadata;
        request.insert("time_to_answer".to_string(), Value::from(self.time_to_answer));
        Ok((self.answer, Value::Object(request)))
    }
}

/// Query parameters of POST /api/exercises/:kind/:id/audio
#[derive(Debug, Deserialize)]
pub struct AudioCheckQuery {
    pub time_to_answer: f64,
}

impl AudioCheckQuery {
    pub fn into_request(self) -> Result<Value> {
        check_time_to_answer(self.time_to_answer)?;
        Ok(serde_json::json!({ "time_to_answer": self.time_to_answer }))
    }
}

/// Query parameters of GET /api/history
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Query parameters of GET /api/history/statistic
#[derive(Debug, Deserialize)]
pub struct HistoryStatisticParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(alias = "type")]
    pub kind: Option<String>,
    pub level: Option<String>,
    pub language: Option<String>,
}

fn parse_one<T>(raw: Option<&str>) -> Result<Option<T>>
where
    T: std::str::FromStr<Err = String>,
{
    raw.map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| item.parse::<T>().map_err(ApiError::BadRequest))
        .transpose()
}

impl HistoryStatisticParams {
    pub fn to_query(&self) -> Result<StatisticQuery> {
        let range =
            StatisticQuery::between(self.start_date, self.end_date).map_err(ApiError::BadRequest)?;
        Ok(StatisticQuery {
            kind: parse_one(self.kind.as_deref())?,
            level: parse_one(self.level.as_deref())?,
            language: parse_one(self.language.as_deref())?,
            ..range
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_list_query_parses_filters() {
        let params = ListExercisesQuery {
            language: Some("en-US, pt-BR".into()),
            kind: Some("listen-term".into()),
            level: None,
            seed: Some(0.5),
            limit: Some(10_000),
        };
        let query = params.to_query().unwrap();
        assert_eq!(
            query.languages,
            vec![Language::EnglishUsa, Language::PortugueseBrazil]
        );
        assert_eq!(query.kinds, vec![ExerciseKind::ListenTerm]);
        assert!(query.levels.is_empty());
        assert_eq!(query.limit, MAX_LIST_LIMIT);
    }

    #[test]
    fn test_list_query_rejects_unknown_values() {
        let params = ListExercisesQuery {
            kind: Some("dance".into()),
            ..Default::default()
        };
        assert!(matches!(params.to_query(), Err(ApiError::BadRequest(_))));

        let params = ListExercisesQuery {
            seed: Some(3.0),
            ..Default::default()
        };
        assert!(matches!(params.to_query(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_check_request_keeps_metadata() {
        let request: CheckRequest = serde_json::from_value(json!({
            "time_to_answer": 3.5,
            "answer": {"term_id": 4},
            "client": "web"
        }))
        .unwrap();

        let (answer, metadata) = request.into_parts().unwrap();
        assert_eq!(answer, json!({"term_id": 4}));
        assert_eq!(metadata, json!({"time_to_answer": 3.5, "client": "web"}));
    }

    #[test]
    fn test_check_request_requires_positive_time() {
        let request: CheckRequest = serde_json::from_value(json!({
            "time_to_answer": 0,
            "answer": {"term_id": 4}
        }))
        .unwrap();
        assert!(request.into_parts().is_err());
    }

    #[test]
    fn test_statistic_params_accept_type_alias() {
        let params: HistoryStatisticParams = serde_json::from_value(json!({
            "start_date": "2024-03-01",
            "end_date": "2024-03-31",
            "type": "speak-term",
            "level": "B1",
        }))
        .unwrap();

        let query = params.to_query().unwrap();
        assert_eq!(query.kind, Some(ExerciseKind::SpeakTerm));
        assert_eq!(query.level, Some(Level::B1));
        assert_eq!(query.language, None);
    }

    #[test]
    fn test_statistic_params_reject_inverted_dates() {
        let params: HistoryStatisticParams = serde_json::from_value(json!({
            "start_date": "2024-03-31",
            "end_date": "2024-03-01",
        }))
        .unwrap();
        assert!(matches!(params.to_query(), Err(ApiError::BadRequest(_))));
    }
}
