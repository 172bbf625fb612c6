//! Exercise Core Library
//!
//! Exercise types, randomized prompt building, answer grading and speech
//! comparison for the language exercise service.

pub mod builder;
pub mod catalog;
pub mod error;
pub mod exercise;
pub mod memory;
pub mod sampler;
pub mod speech;
pub mod text;
pub mod validate;

pub use builder::{
    Answer, BuilderRegistry, CheckResult, CorrectAnswer, ExerciseBuilder, ExerciseSession, Prompt,
};
pub use catalog::{
    AttemptHistory, ExerciseAttempt, ExerciseCatalog, ExerciseQuery, HistoryStatistic,
    HistorySummary, StatisticQuery,
};
pub use error::{CatalogError, ExerciseError, Result, ValidationError};
pub use exercise::{
    ChoiceSource, Exercise, ExerciseBody, ExerciseKind, Language, Level, TermId,
};
pub use memory::{InMemoryCatalog, InMemoryHistory};
pub use sampler::ChoiceMap;
pub use speech::{AudioClip, Transcriber, TranscriptionError};
pub use validate::{CreatedExercise, NewExercise};
