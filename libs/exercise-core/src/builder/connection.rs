use rand::RngCore;

use super::{kind_mismatch, wrong_answer_shape, Answer, CorrectAnswer, ExerciseBuilder, Prompt};
use crate::error::Result;
use crate::exercise::{Exercise, ExerciseBody, ExerciseKind, TermConnection};
use crate::sampler::{sample_choices, shuffle_map};

/// Related terms placed in each prompt.
pub const CONNECTION_SAMPLE: usize = 4;
/// Unrelated terms placed in each prompt.
pub const CONNECTION_DISTRACTOR_SAMPLE: usize = 8;

/// Find the terms related to a word among a grid of twelve.
///
/// An answer is correct when every selected id is one of the stored
/// connections, even if it is not among those shown. Neither the number of
/// selected ids nor missing connections count against it.
pub struct TermConnectionBuilder;

impl TermConnectionBuilder {
    fn payload<'a>(&self, exercise: &'a Exercise) -> Result<&'a TermConnection> {
        match &exercise.body {
            ExerciseBody::TermConnection(payload) => Ok(payload),
            _ => Err(kind_mismatch(exercise, self.kind())),
        }
    }
}

impl ExerciseBuilder for TermConnectionBuilder {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::TermConnection
    }

    fn build(&self, exercise: &Exercise, rng: &mut dyn RngCore) -> Result<Prompt> {
        let payload = self.payload(exercise)?;

        let mut choices = sample_choices(&payload.connections, CONNECTION_SAMPLE, rng)?;
        choices.extend(sample_choices(
            &payload.distractors,
            CONNECTION_DISTRACTOR_SAMPLE,
            rng,
        )?);

        Ok(Prompt::TextChoice {
            choices: shuffle_map(choices, rng),
            content: payload.content.clone(),
        })
    }

    fn correct_answer(&self, exercise: &Exercise) -> Result<CorrectAnswer> {
        let payload = self.payload(exercise)?;
        Ok(CorrectAnswer::Connections(
            payload.connections.keys().copied().collect(),
        ))
    }

    fn assert_answer(&self, exercise: &Exercise, answer: &Answer) -> Result<bool> {
        let payload = self.payload(exercise)?;
        match answer {
            Answer::Connections(ids) => {
                Ok(ids.iter().all(|id| payload.connections.contains_key(id)))
            }
            other => Err(wrong_answer_shape(self.kind(), other)),
        }
    }
}
