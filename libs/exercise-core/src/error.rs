//! Error types for exercise-core.

use thiserror::Error;
use uuid::Uuid;

use crate::exercise::{ExerciseKind, TermId};

/// Result type alias using ExerciseError.
pub type Result<T> = std::result::Result<T, ExerciseError>;

/// Errors produced while building, grading or storing exercises.
#[derive(Debug, Error)]
pub enum ExerciseError {
    #[error("exercise {id} of kind {kind} not found")]
    NotFound { id: Uuid, kind: ExerciseKind },

    #[error("invalid answer: {0}")]
    InvalidAnswerShape(String),

    #[error("not enough choices: requested {requested}, available {available}")]
    InsufficientChoices { requested: usize, available: usize },

    #[error("audio is {duration_secs:.1}s long, at most {max_secs}s allowed")]
    AudioTooLong { duration_secs: f64, max_secs: u64 },

    #[error("unsupported audio format: {0}")]
    UnsupportedAudioFormat(String),

    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("transcription service unavailable: {0}")]
    TranscriptionServiceUnavailable(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Creation-time invariant violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must not be blank")]
    BlankField { field: &'static str },

    #[error("{field} needs at least {min} entries, got {actual}")]
    TooFewChoices {
        field: &'static str,
        min: usize,
        actual: usize,
    },

    #[error("answer id {id} cannot appear in {field}")]
    AnswerInChoices { field: &'static str, id: TermId },

    #[error("id {id} appears in both connections and distractors")]
    OverlappingChoices { id: TermId },

    #[error("invalid {field}: {value}")]
    InvalidUrl { field: &'static str, value: String },
}

/// Errors reported by catalog and history collaborators.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("exercise of kind {kind} already exists for term {term_reference}")]
    Duplicate {
        term_reference: TermId,
        kind: ExerciseKind,
    },

    #[error("storage error: {0}")]
    Storage(String),
}
