//! PostgreSQL database operations

use async_trait::async_trait;
use exercise_core::catalog::CatalogResult;
use exercise_core::{
    AttemptHistory, CatalogError, Exercise, ExerciseAttempt, ExerciseCatalog, ExerciseKind,
    ExerciseQuery, HistoryStatistic, HistorySummary, Language, StatisticQuery, TermId,
};
use sqlx::types::Json;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

const EXERCISE_COLUMNS: &str =
    "id, language, term_reference, kind, level, random_score, body, created_at";

const ATTEMPT_COLUMNS: &str =
    "id, exercise_id, kind, language, level, user_id, correct, response, request, created_at";

fn storage_error(err: sqlx::Error) -> CatalogError {
    tracing::error!(error = %err, "database query failed");
    CatalogError::Storage(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL and create connection pool
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(sqlx::Error::from)?;
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // === Exercise Repository ===

    pub async fn insert_exercise(&self, exercise: &Exercise) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO exercises (id, language, term_reference, kind, level, random_score, body)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(exercise.id)
        .bind(exercise.language.as_str())
        .bind(exercise.term_reference.0)
        .bind(exercise.kind().as_str())
        .bind(exercise.level.map(|level| level.as_str()))
        .bind(exercise.random_score)
        .bind(Json(&exercise.body))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_exercise(
        &self,
        id: Uuid,
        kind: ExerciseKind,
    ) -> sqlx::Result<Option<DbExercise>> {
        let sql = format!("SELECT {EXERCISE_COLUMNS} FROM exercises WHERE id = $1 AND kind = $2");
        let exercise = sqlx::query_as::<_, DbExercise>(&sql)
            .bind(id)
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(exercise)
    }

    pub async fn get_exercise_by_reference(
        &self,
        language: Language,
        term_reference: TermId,
        kind: ExerciseKind,
    ) -> sqlx::Result<Option<DbExercise>> {
        let sql = format!(
            "SELECT {EXERCISE_COLUMNS} FROM exercises \
             WHERE language = $1 AND term_reference = $2 AND kind = $3"
        );
        let exercise = sqlx::query_as::<_, DbExercise>(&sql)
            .bind(language.as_str())
            .bind(term_reference.0)
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(exercise)
    }

    /// Filtered exercises ordered by `random_score mod seed`
    pub async fn list_exercises(&self, query: &ExerciseQuery) -> sqlx::Result<Vec<DbExercise>> {
        let languages: Vec<&str> = query.languages.iter().map(|l| l.as_str()).collect();
        let kinds: Vec<&str> = query.kinds.iter().map(|k| k.as_str()).collect();
        let levels: Vec<&str> = query.levels.iter().map(|l| l.as_str()).collect();

        let sql = format!(
            r#"
            SELECT {EXERCISE_COLUMNS}
            FROM exercises
            WHERE (cardinality($1::text[]) = 0 OR language = ANY($1))
              AND (cardinality($2::text[]) = 0 OR kind = ANY($2))
              AND (cardinality($3::text[]) = 0 OR level = ANY($3))
            ORDER BY
                CASE WHEN $4::float8 > 0
                     THEN mod(random_score::numeric, ($4::float8)::numeric)
                     ELSE random_score::numeric
                END,
                id
            LIMIT $5
            "#
        );
        let exercises = sqlx::query_as::<_, DbExercise>(&sql)
            .bind(&languages)
            .bind(&kinds)
            .bind(&levels)
            .bind(query.seed)
            .bind(i64::try_from(query.limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        Ok(exercises)
    }

    // === Attempt Repository ===

    pub async fn insert_attempt(&self, attempt: &ExerciseAttempt) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO exercise_attempts
                (id, exercise_id, kind, language, level, user_id, correct, response, request, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(attempt.id)
        .bind(attempt.exercise_id)
        .bind(attempt.kind.as_str())
        .bind(attempt.language.as_str())
        .bind(attempt.level.map(|level| level.as_str()))
        .bind(attempt.user_id)
        .bind(attempt.correct)
        .bind(Json(&attempt.response))
        .bind(Json(&attempt.request))
        .bind(attempt.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Attempts of a user, newest first
    pub async fn get_attempts_for_user(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> sqlx::Result<Vec<DbAttempt>> {
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM exercise_attempts \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2"
        );
        let attempts = sqlx::query_as::<_, DbAttempt>(&sql)
            .bind(user_id)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        Ok(attempts)
    }

    pub async fn get_history_summary(&self, user_id: Uuid) -> sqlx::Result<HistorySummary> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE correct) AS correct,
                COUNT(*) FILTER (WHERE NOT correct) AS incorrect,
                COUNT(*) FILTER (
                    WHERE created_at > COALESCE(
                        (SELECT MAX(created_at) FROM exercise_attempts
                         WHERE user_id = $1 AND NOT correct),
                        '-infinity'::timestamptz
                    )
                ) AS streak
            FROM exercise_attempts
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let count = |column: &str| -> sqlx::Result<u64> {
            Ok(row.try_get::<i64, _>(column)?.max(0) as u64)
        };
        Ok(HistorySummary {
            correct: count("correct")?,
            incorrect: count("incorrect")?,
            streak: count("streak")?,
        })
    }

    /// Outcome counts over the UTC days `start_date..=end_date`
    pub async fn get_history_statistic(
        &self,
        user_id: Uuid,
        query: &StatisticQuery,
    ) -> sqlx::Result<HistoryStatistic> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE correct) AS correct,
                COUNT(*) FILTER (WHERE NOT correct) AS incorrect
            FROM exercise_attempts
            WHERE user_id = $1
              AND (created_at AT TIME ZONE 'UTC')::date BETWEEN $2 AND $3
              AND ($4::text IS NULL OR kind = $4)
              AND ($5::text IS NULL OR level = $5)
              AND ($6::text IS NULL OR language = $6)
            "#,
        )
        .bind(user_id)
        .bind(query.start_date)
        .bind(query.end_date)
        .bind(query.kind.map(|kind| kind.as_str()))
        .bind(query.level.map(|level| level.as_str()))
        .bind(query.language.map(|language| language.as_str()))
        .fetch_one(&self.pool)
        .await?;

        let count = |column: &str| -> sqlx::Result<u64> {
            Ok(row.try_get::<i64, _>(column)?.max(0) as u64)
        };
        Ok(HistoryStatistic {
            correct: count("correct")?,
            incorrect: count("incorrect")?,
        })
    }
}

#[async_trait]
impl ExerciseCatalog for Database {
    async fn get(&self, id: Uuid, kind: ExerciseKind) -> CatalogResult<Option<Exercise>> {
        self.get_exercise(id, kind)
            .await
            .map_err(storage_error)?
            .map(DbExercise::into_exercise)
            .transpose()
    }

    async fn find_by_reference(
        &self,
        language: Language,
        term_reference: TermId,
        kind: ExerciseKind,
    ) -> CatalogResult<Option<Exercise>> {
        self.get_exercise_by_reference(language, term_reference, kind)
            .await
            .map_err(storage_error)?
            .map(DbExercise::into_exercise)
            .transpose()
    }

    async fn insert(&self, exercise: &Exercise) -> CatalogResult<()> {
        self.insert_exercise(exercise).await.map_err(|err| {
            if is_unique_violation(&err) {
                CatalogError::Duplicate {
                    term_reference: exercise.term_reference,
                    kind: exercise.kind(),
                }
            } else {
                storage_error(err)
            }
        })
    }

    async fn list(&self, query: &ExerciseQuery) -> CatalogResult<Vec<Exercise>> {
        self.list_exercises(query)
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(DbExercise::into_exercise)
            .collect()
    }
}

#[async_trait]
impl AttemptHistory for Database {
    async fn append(&self, attempt: ExerciseAttempt) -> CatalogResult<()> {
        self.insert_attempt(&attempt).await.map_err(storage_error)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> CatalogResult<Vec<ExerciseAttempt>> {
        self.get_attempts_for_user(user_id, limit)
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(DbAttempt::into_attempt)
            .collect()
    }

    async fn summary(&self, user_id: Uuid) -> CatalogResult<HistorySummary> {
        self.get_history_summary(user_id)
            .await
            .map_err(storage_error)
    }

    async fn statistic(
        &self,
        user_id: Uuid,
        query: &StatisticQuery,
    ) -> CatalogResult<HistoryStatistic> {
        self.get_history_statistic(user_id, query)
            .await
            .map_err(storage_error)
    }
}
