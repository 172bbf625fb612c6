//! Creation-time validation and repair of new exercises.

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::exercise::{
    ChoiceSource, Exercise, ExerciseBody, Language, Level, Listen, OrderSentence, Speak, TermId,
};
use crate::text::normalize;

/// Minimum distractors for a 4-way multiple choice.
pub const MIN_CHOICE_DISTRACTORS: usize = 3;
/// Minimum connections of a term connection exercise.
pub const MIN_CONNECTIONS: usize = 8;
/// Minimum distractors of a term connection exercise.
pub const MIN_CONNECTION_DISTRACTORS: usize = 16;

const AUDIO_EXTENSIONS: &[&str] = &[".mp3", ".wav", ".ogg", ".aac", ".flac", ".m4a"];
const IMAGE_EXTENSIONS: &[&str] = &[".svg"];

/// Exercise as submitted for creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExercise {
    pub language: Language,
    pub term_reference: TermId,
    #[serde(default)]
    pub level: Option<Level>,
    #[serde(flatten)]
    pub body: ExerciseBody,
}

/// A validated exercise, ready to be stored.
#[derive(Debug, Clone)]
pub struct CreatedExercise {
    pub exercise: Exercise,
    /// Order sentence distractors removed because they duplicated a sentence
    /// token or another distractor.
    pub dropped_distractors: Vec<String>,
}

impl NewExercise {
    /// Check every creation invariant and assign id and random score.
    pub fn into_exercise<R: Rng + ?Sized>(
        self,
        rng: &mut R,
    ) -> Result<CreatedExercise, ValidationError> {
        let mut dropped_distractors = Vec::new();

        let body = match self.body {
            ExerciseBody::OrderSentence(payload) => {
                let (payload, dropped) = repair_order_sentence(payload)?;
                dropped_distractors = dropped;
                ExerciseBody::OrderSentence(payload)
            }
            ExerciseBody::ListenTerm(payload) => ExerciseBody::ListenTerm(check_listen(payload)?),
            ExerciseBody::ListenSentence(payload) => {
                ExerciseBody::ListenSentence(check_listen(payload)?)
            }
            ExerciseBody::SpeakTerm(payload) => ExerciseBody::SpeakTerm(check_speak(payload)?),
            ExerciseBody::SpeakSentence(payload) => {
                ExerciseBody::SpeakSentence(check_speak(payload)?)
            }
            ExerciseBody::ListenTermMchoice(payload) => {
                check_url("audio_url", &payload.audio_url, AUDIO_EXTENSIONS)?;
                check_not_blank("content", &payload.content)?;
                check_choices(&payload.distractors, &[self.term_reference])?;
                ExerciseBody::ListenTermMchoice(payload)
            }
            ExerciseBody::TermSentenceMchoice(payload) => {
                check_not_blank("sentence", &payload.sentence)?;
                check_not_blank("answer", &payload.answer)?;
                check_choices(&payload.distractors, &[self.term_reference])?;
                ExerciseBody::TermSentenceMchoice(payload)
            }
            ExerciseBody::TermDefinitionMchoice(payload) => {
                check_not_blank("content", &payload.content)?;
                check_not_blank("answer", &payload.answer)?;
                check_choices(
                    &payload.distractors,
                    &[self.term_reference, payload.term_definition_id],
                )?;
                ExerciseBody::TermDefinitionMchoice(payload)
            }
            ExerciseBody::TermImageMchoice(payload) => {
                check_url("image_url", &payload.image_url, IMAGE_EXTENSIONS)?;
                check_url("audio_url", &payload.audio_url, AUDIO_EXTENSIONS)?;
                check_choices(&payload.distractors, &[self.term_reference])?;
                ExerciseBody::TermImageMchoice(payload)
            }
            ExerciseBody::TermImageTextMchoice(payload) => {
                check_url("image_url", &payload.image_url, IMAGE_EXTENSIONS)?;
                check_not_blank("answer", &payload.answer)?;
                check_choices(&payload.distractors, &[self.term_reference])?;
                ExerciseBody::TermImageTextMchoice(payload)
            }
            ExerciseBody::TermConnection(payload) => {
                check_not_blank("content", &payload.content)?;
                check_min("connections", &payload.connections, MIN_CONNECTIONS)?;
                check_min("distractors", &payload.distractors, MIN_CONNECTION_DISTRACTORS)?;
                check_excludes("connections", &payload.connections, &[self.term_reference])?;
                check_excludes("distractors", &payload.distractors, &[self.term_reference])?;
                if let Some(id) = payload
                    .connections
                    .keys()
                    .find(|id| payload.distractors.contains_key(id))
                {
                    return Err(ValidationError::OverlappingChoices { id: *id });
                }
                ExerciseBody::TermConnection(payload)
            }
        };

        Ok(CreatedExercise {
            exercise: Exercise {
                id: Uuid::new_v4(),
                language: self.language,
                term_reference: self.term_reference,
                level: self.level,
                random_score: rng.gen::<f64>(),
                body,
            },
            dropped_distractors,
        })
    }
}

/// Drop distractors that collide with the sentence or with each other.
fn repair_order_sentence(
    mut payload: OrderSentence,
) -> Result<(OrderSentence, Vec<String>), ValidationError> {
    if payload.sentence.is_empty() {
        return Err(ValidationError::BlankField { field: "sentence" });
    }
    if payload.sentence.iter().any(|token| token.trim().is_empty()) {
        return Err(ValidationError::BlankField {
            field: "sentence token",
        });
    }

    let mut seen: HashSet<String> = payload.sentence.iter().map(|t| normalize(t)).collect();
    let mut kept = Vec::with_capacity(payload.distractors.len());
    let mut dropped = Vec::new();

    for token in payload.distractors {
        let key = normalize(&token);
        if key.is_empty() || !seen.insert(key) {
            dropped.push(token);
        } else {
            kept.push(token);
        }
    }

    payload.distractors = kept;
    Ok((payload, dropped))
}

fn check_listen(payload: Listen) -> Result<Listen, ValidationError> {
    check_url("audio_url", &payload.audio_url, AUDIO_EXTENSIONS)?;
    check_not_blank("answer", &payload.answer)?;
    Ok(payload)
}

fn check_speak(payload: Speak) -> Result<Speak, ValidationError> {
    check_url("audio_url", &payload.audio_url, AUDIO_EXTENSIONS)?;
    check_not_blank("answer", &payload.answer)?;
    check_not_blank("phonetic", &payload.phonetic)?;
    Ok(payload)
}

fn check_not_blank(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if normalize(value).is_empty() {
        return Err(ValidationError::BlankField { field });
    }
    Ok(())
}

fn check_choices(distractors: &ChoiceSource, answers: &[TermId]) -> Result<(), ValidationError> {
    check_min("distractors", distractors, MIN_CHOICE_DISTRACTORS)?;
    check_excludes("distractors", distractors, answers)
}

fn check_min(
    field: &'static str,
    choices: &ChoiceSource,
    min: usize,
) -> Result<(), ValidationError> {
    if choices.len() < min {
        return Err(ValidationError::TooFewChoices {
            field,
            min,
            actual: choices.len(),
        });
    }
    Ok(())
}

fn check_excludes(
    field: &'static str,
    choices: &ChoiceSource,
    answers: &[TermId],
) -> Result<(), ValidationError> {
    match answers.iter().find(|id| choices.contains_key(id)) {
        Some(id) => Err(ValidationError::AnswerInChoices { field, id: *id }),
        None => Ok(()),
    }
}

/// Accept `http(s)://host/path.ext` with one of the allowed extensions.
fn check_url(field: &'static str, value: &str, extensions: &[&str]) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidUrl {
        field,
        value: value.to_string(),
    };

    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .ok_or_else(invalid)?;
    let (host, path) = rest.split_once('/').ok_or_else(invalid)?;
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(invalid());
    }

    let path = path
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .to_lowercase();
    if !extensions.iter().any(|ext| path.ends_with(ext)) {
        return Err(invalid());
    }
    Ok(())
}
