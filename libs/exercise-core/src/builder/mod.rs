//! Per-kind prompt building and answer grading.
//!
//! Every [`ExerciseKind`] has one [`ExerciseBuilder`]. Builders are stateless
//! and live in a [`BuilderRegistry`] created once at startup. A builder bound
//! to a stored exercise forms an [`ExerciseSession`], which is what callers
//! build and grade through.

mod choice;
mod connection;
mod listen;
mod order;
mod speak;

pub use choice::{MultipleChoiceBuilder, CHOICE_DISTRACTORS};
pub use connection::{TermConnectionBuilder, CONNECTION_DISTRACTOR_SAMPLE, CONNECTION_SAMPLE};
pub use listen::ListenBuilder;
pub use order::OrderSentenceBuilder;
pub use speak::SpeakBuilder;

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::catalog::{AttemptHistory, ExerciseAttempt};
use crate::error::{CatalogError, ExerciseError, Result};
use crate::exercise::{Exercise, ExerciseKind, TermId};
use crate::sampler::ChoiceMap;

/// Kind-specific build and grading rules.
pub trait ExerciseBuilder: Send + Sync {
    /// The kind this builder handles.
    fn kind(&self) -> ExerciseKind;

    /// Question payload shown to the student. Never reveals the answer.
    fn build(&self, exercise: &Exercise, rng: &mut dyn RngCore) -> Result<Prompt>;

    /// Canonical answer, echoed back with every grading result.
    fn correct_answer(&self, exercise: &Exercise) -> Result<CorrectAnswer>;

    /// Kind-specific equivalence test.
    fn assert_answer(&self, exercise: &Exercise, answer: &Answer) -> Result<bool>;
}

/// Public question payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Prompt {
    OrderSentence {
        sentence: Vec<String>,
    },
    Listen {
        audio_url: String,
    },
    Speak {
        audio_url: String,
        phonetic: String,
        content: String,
    },
    TextChoice {
        choices: ChoiceMap,
        content: String,
    },
    ImageChoice {
        choices: ChoiceMap,
        audio_url: String,
    },
    TextImageChoice {
        choices: ChoiceMap,
        image_url: String,
    },
}

impl Prompt {
    pub fn choices(&self) -> Option<&ChoiceMap> {
        match self {
            Self::TextChoice { choices, .. }
            | Self::ImageChoice { choices, .. }
            | Self::TextImageChoice { choices, .. } => Some(choices),
            _ => None,
        }
    }
}

/// Canonical answer in the shape of its kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CorrectAnswer {
    Sentence(Vec<String>),
    Text(String),
    Choice(TermId),
    Connections(Vec<TermId>),
}

/// A submitted answer after schema validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Sentence(Vec<String>),
    Text(String),
    Choice(TermId),
    Connections(Vec<TermId>),
    Transcription(String),
}

#[derive(Deserialize)]
struct SentenceAnswer {
    sentence: Vec<String>,
}

#[derive(Deserialize)]
struct TextAnswer {
    content: String,
}

#[derive(Deserialize)]
struct ChoiceAnswer {
    term_id: TermId,
}

#[derive(Deserialize)]
struct ConnectionAnswer {
    choices: Vec<TermId>,
}

fn parse_schema<T: for<'de> Deserialize<'de>>(kind: ExerciseKind, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| ExerciseError::InvalidAnswerShape(format!("{kind} answer: {e}")))
}

impl Answer {
    /// Validate a JSON answer against the schema of `kind`.
    pub fn parse(kind: ExerciseKind, value: Value) -> Result<Self> {
        match kind {
            ExerciseKind::OrderSentence => {
                let answer: SentenceAnswer = parse_schema(kind, value)?;
                Ok(Self::Sentence(answer.sentence))
            }
            ExerciseKind::ListenTerm | ExerciseKind::ListenSentence => {
                let answer: TextAnswer = parse_schema(kind, value)?;
                Ok(Self::Text(answer.content))
            }
            ExerciseKind::ListenTermMchoice
            | ExerciseKind::TermSentenceMchoice
            | ExerciseKind::TermDefinitionMchoice
            | ExerciseKind::TermImageMchoice
            | ExerciseKind::TermImageTextMchoice => {
                let answer: ChoiceAnswer = parse_schema(kind, value)?;
                Ok(Self::Choice(answer.term_id))
            }
            ExerciseKind::TermConnection => {
                let answer: ConnectionAnswer = parse_schema(kind, value)?;
                let distinct: HashSet<TermId> = answer.choices.iter().copied().collect();
                if distinct.len() != answer.choices.len() {
                    return Err(ExerciseError::InvalidAnswerShape(format!(
                        "{kind} answer repeats a choice"
                    )));
                }
                Ok(Self::Connections(answer.choices))
            }
            ExerciseKind::SpeakTerm | ExerciseKind::SpeakSentence => {
                Err(ExerciseError::InvalidAnswerShape(format!(
                    "{kind} is answered with an audio recording"
                )))
            }
        }
    }
}

/// Outcome of one grading call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub correct: bool,
    pub correct_answer: CorrectAnswer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_transcription: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_diff: Option<BTreeSet<usize>>,
}

/// Builders by kind.
#[derive(Default)]
pub struct BuilderRegistry {
    builders: HashMap<ExerciseKind, Box<dyn ExerciseBuilder>>,
}

impl BuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a builder for every kind.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(OrderSentenceBuilder));
        registry.register(Box::new(ListenBuilder::new(ExerciseKind::ListenTerm)));
        registry.register(Box::new(ListenBuilder::new(ExerciseKind::ListenSentence)));
        registry.register(Box::new(SpeakBuilder::new(ExerciseKind::SpeakTerm)));
        registry.register(Box::new(SpeakBuilder::new(ExerciseKind::SpeakSentence)));
        for kind in [
            ExerciseKind::ListenTermMchoice,
            ExerciseKind::TermSentenceMchoice,
            ExerciseKind::TermDefinitionMchoice,
            ExerciseKind::TermImageMchoice,
            ExerciseKind::TermImageTextMchoice,
        ] {
            registry.register(Box::new(MultipleChoiceBuilder::new(kind)));
        }
        registry.register(Box::new(TermConnectionBuilder));
        registry
    }

    /// Add a builder, returning the one it replaces.
    pub fn register(
        &mut self,
        builder: Box<dyn ExerciseBuilder>,
    ) -> Option<Box<dyn ExerciseBuilder>> {
        self.builders.insert(builder.kind(), builder)
    }

    pub fn get(&self, kind: ExerciseKind) -> Option<&dyn ExerciseBuilder> {
        self.builders.get(&kind).map(|b| b.as_ref())
    }

    /// Bind a stored exercise to its builder.
    ///
    /// The exercise must be of the `expected` kind, otherwise the lookup is
    /// treated as a miss.
    pub fn bind(&self, exercise: Exercise, expected: ExerciseKind) -> Result<ExerciseSession<'_>> {
        let not_found = ExerciseError::NotFound {
            id: exercise.id,
            kind: expected,
        };
        if exercise.kind() != expected {
            return Err(not_found);
        }
        let builder = self.get(expected).ok_or(not_found)?;
        Ok(ExerciseSession { exercise, builder })
    }
}

/// One stored exercise together with the rules of its kind.
pub struct ExerciseSession<'r> {
    exercise: Exercise,
    builder: &'r dyn ExerciseBuilder,
}

impl ExerciseSession<'_> {
    pub fn exercise(&self) -> &Exercise {
        &self.exercise
    }

    pub fn kind(&self) -> ExerciseKind {
        self.builder.kind()
    }

    pub fn build(&self, rng: &mut dyn RngCore) -> Result<Prompt> {
        self.builder.build(&self.exercise, rng)
    }

    pub fn correct_answer(&self) -> Result<CorrectAnswer> {
        self.builder.correct_answer(&self.exercise)
    }

    pub fn assert_answer(&self, answer: &Answer) -> Result<bool> {
        self.builder.assert_answer(&self.exercise, answer)
    }

    /// Grade without recording anything.
    pub fn grade(&self, answer: &Answer) -> Result<CheckResult> {
        Ok(CheckResult {
            correct: self.assert_answer(answer)?,
            correct_answer: self.correct_answer()?,
            user_transcription: None,
            text_diff: None,
        })
    }

    /// Validate, grade and record a structured answer.
    pub async fn check(
        &self,
        history: &dyn AttemptHistory,
        user_id: Uuid,
        answer: Value,
        request: Value,
    ) -> Result<CheckResult> {
        let parsed = Answer::parse(self.kind(), answer.clone())?;
        let result = self.grade(&parsed)?;
        self.record(history, user_id, answer, &result, request).await?;
        Ok(result)
    }

    /// Append the attempt; the stored response is the answer merged with the result.
    pub(crate) async fn record(
        &self,
        history: &dyn AttemptHistory,
        user_id: Uuid,
        answer: Value,
        result: &CheckResult,
        request: Value,
    ) -> Result<()> {
        let mut response = match answer {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("answer".to_string(), other);
                map
            }
        };
        response.extend(outcome_fields(result)?);

        history
            .append(ExerciseAttempt {
                id: Uuid::new_v4(),
                exercise_id: self.exercise.id,
                kind: self.kind(),
                language: self.exercise.language,
                level: self.exercise.level,
                user_id,
                correct: result.correct,
                response: Value::Object(response),
                request,
                created_at: Utc::now(),
            })
            .await?;
        Ok(())
    }
}

/// `result` as the JSON fields merged into a recorded response.
fn outcome_fields(result: &CheckResult) -> Result<serde_json::Map<String, Value>> {
    match serde_json::to_value(result) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(CatalogError::Storage(format!(
            "grading result encoded as {other} instead of an object"
        ))
        .into()),
        Err(e) => Err(CatalogError::Storage(format!("cannot encode grading result: {e}")).into()),
    }
}

/// Error for a builder handed an exercise of another kind.
pub(crate) fn kind_mismatch(exercise: &Exercise, expected: ExerciseKind) -> ExerciseError {
    ExerciseError::NotFound {
        id: exercise.id,
        kind: expected,
    }
}

/// Error for an answer variant the builder does not grade.
pub(crate) fn wrong_answer_shape(kind: ExerciseKind, answer: &Answer) -> ExerciseError {
    ExerciseError::InvalidAnswerShape(format!("{kind} cannot grade {answer:?}"))
}


#[cfg(test)]
mod tests {
    use super::fixtures::exercise;
    use super::*;
    use crate::exercise::{ExerciseBody, Listen, OrderSentence};
    use crate::memory::InMemoryHistory;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_standard_registry_covers_every_kind() {
        let registry = BuilderRegistry::standard();
        for kind in ExerciseKind::ALL {
            assert_eq!(registry.get(kind).map(|b| b.kind()), Some(kind));
        }
    }

    #[test]
    fn test_bind_rejects_kind_mismatch() {
        let registry = BuilderRegistry::standard();
        let stored = exercise(
            1,
            ExerciseBody::ListenTerm(Listen {
                audio_url: "https://example.com/a.mp3".into(),
                answer: "house".into(),
            }),
        );

        let err = registry
            .bind(stored, ExerciseKind::ListenSentence)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ExerciseError::NotFound {
                kind: ExerciseKind::ListenSentence,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_answer_schemas() {
        assert_eq!(
            Answer::parse(ExerciseKind::OrderSentence, json!({"sentence": ["a", "b"]})).unwrap(),
            Answer::Sentence(vec!["a".into(), "b".into()])
        );
        assert_eq!(
            Answer::parse(ExerciseKind::TermImageMchoice, json!({"term_id": 4})).unwrap(),
            Answer::Choice(TermId(4))
        );
        assert!(matches!(
            Answer::parse(ExerciseKind::ListenTerm, json!({"term_id": 4})),
            Err(ExerciseError::InvalidAnswerShape(_))
        ));
        assert!(matches!(
            Answer::parse(ExerciseKind::SpeakTerm, json!({"content": "x"})),
            Err(ExerciseError::InvalidAnswerShape(_))
        ));
    }

    #[test]
    fn test_parse_connection_answer_any_size() {
        assert_eq!(
            Answer::parse(ExerciseKind::TermConnection, json!({"choices": []})).unwrap(),
            Answer::Connections(Vec::new())
        );
        assert_eq!(
            Answer::parse(ExerciseKind::TermConnection, json!({"choices": [1, 2, 3, 4, 5]}))
                .unwrap(),
            Answer::Connections((1..=5).map(TermId).collect())
        );
        assert!(Answer::parse(ExerciseKind::TermConnection, json!({"choices": [1, 1]})).is_err());
    }

    #[tokio::test]
    async fn test_check_records_attempt() {
        let registry = BuilderRegistry::standard();
        let history = InMemoryHistory::new();
        let user = Uuid::new_v4();
        let stored = exercise(
            5,
            ExerciseBody::OrderSentence(OrderSentence {
                sentence: vec!["I".into(), "am".into(), "here".into()],
                distractors: vec!["is".into()],
            }),
        );
        let exercise_id = stored.id;
        let session = registry.bind(stored, ExerciseKind::OrderSentence).unwrap();

        let result = session
            .check(
                &history,
                user,
                json!({"sentence": ["I", "am", "here"]}),
                json!({"time_to_answer": 12}),
            )
            .await
            .unwrap();
        assert!(result.correct);

        let attempts = history.list_for_user(user, 10).await.unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].exercise_id, exercise_id);
        assert_eq!(attempts[0].response["correct"], json!(true));
        assert_eq!(attempts[0].response["sentence"], json!(["I", "am", "here"]));
        assert_eq!(attempts[0].request["time_to_answer"], json!(12));
    }

    #[test]
    fn test_outcome_fields_carry_the_grading_result() {
        let result = CheckResult {
            correct: false,
            correct_answer: CorrectAnswer::Text("I like pizza".into()),
            user_transcription: Some("i bike pasta".into()),
            text_diff: Some(BTreeSet::from([1, 2])),
        };

        let fields = outcome_fields(&result).unwrap();
        assert_eq!(
            Value::Object(fields),
            json!({
                "correct": false,
                "correct_answer": "I like pizza",
                "user_transcription": "i bike pasta",
                "text_diff": [1, 2],
            })
        );
    }

    #[tokio::test]
    async fn test_recorded_result_overrides_answer_fields() {
        let registry = BuilderRegistry::standard();
        let history = InMemoryHistory::new();
        let user = Uuid::new_v4();
        let stored = exercise(
            6,
            ExerciseBody::ListenTerm(Listen {
                audio_url: "https://example.com/a.mp3".into(),
                answer: "house".into(),
            }),
        );
        let session = registry.bind(stored, ExerciseKind::ListenTerm).unwrap();

        session
            .check(
                &history,
                user,
                json!({"content": "mouse", "correct": true}),
                json!({}),
            )
            .await
            .unwrap();

        let attempts = history.list_for_user(user, 10).await.unwrap();
        assert_eq!(attempts[0].response["correct"], json!(false));
        assert_eq!(attempts[0].response["correct_answer"], json!("house"));
        assert_eq!(attempts[0].response["content"], json!("mouse"));
    }

    #[tokio::test]
    async fn test_invalid_answer_is_not_recorded() {
        let registry = BuilderRegistry::standard();
        let history = InMemoryHistory::new();
        let user = Uuid::new_v4();
        let stored = exercise(
            5,
            ExerciseBody::ListenTerm(Listen {
                audio_url: "https://example.com/a.mp3".into(),
                answer: "house".into(),
            }),
        );
        let session = registry.bind(stored, ExerciseKind::ListenTerm).unwrap();

        let err = session
            .check(&history, user, json!({"sentence": []}), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ExerciseError::InvalidAnswerShape(_)));
        assert!(history.list_for_user(user, 10).await.unwrap().is_empty());
    }
}
