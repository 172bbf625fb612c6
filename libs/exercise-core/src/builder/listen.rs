use rand::RngCore;

use super::{kind_mismatch, wrong_answer_shape, Answer, CorrectAnswer, ExerciseBuilder, Prompt};
use crate::error::Result;
use crate::exercise::{Exercise, ExerciseBody, ExerciseKind, Listen};
use crate::text::normalize;

/// Type what the recording says. Serves ListenTerm and ListenSentence.
pub struct ListenBuilder {
    kind: ExerciseKind,
}

impl ListenBuilder {
    pub fn new(kind: ExerciseKind) -> Self {
        Self { kind }
    }

    fn payload<'a>(&self, exercise: &'a Exercise) -> Result<&'a Listen> {
        match (&exercise.body, self.kind) {
            (ExerciseBody::ListenTerm(payload), ExerciseKind::ListenTerm)
            | (ExerciseBody::ListenSentence(payload), ExerciseKind::ListenSentence) => Ok(payload),
            _ => Err(kind_mismatch(exercise, self.kind)),
        }
    }
}

impl ExerciseBuilder for ListenBuilder {
    fn kind(&self) -> ExerciseKind {
        self.kind
    }

    fn build(&self, exercise: &Exercise, _rng: &mut dyn RngCore) -> Result<Prompt> {
        Ok(Prompt::Listen {
            audio_url: self.payload(exercise)?.audio_url.clone(),
        })
    }

    fn correct_answer(&self, exercise: &Exercise) -> Result<CorrectAnswer> {
        Ok(CorrectAnswer::Text(self.payload(exercise)?.answer.clone()))
    }

    fn assert_answer(&self, exercise: &Exercise, answer: &Answer) -> Result<bool> {
        let payload = self.payload(exercise)?;
        match answer {
            Answer::Text(content) => Ok(normalize(content) == normalize(&payload.answer)),
            other => Err(wrong_answer_shape(self.kind, other)),
        }
    }
}
