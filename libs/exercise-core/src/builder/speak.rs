use rand::RngCore;

use super::{kind_mismatch, wrong_answer_shape, Answer, CorrectAnswer, ExerciseBuilder, Prompt};
use crate::error::Result;
use crate::exercise::{Exercise, ExerciseBody, ExerciseKind, Speak};
use crate::speech::grade_transcription;

/// Read the text aloud. Serves SpeakTerm and SpeakSentence.
///
/// Only transcriptions are graded here; turning audio into one is the job of
/// [`ExerciseSession::check_speech`](super::ExerciseSession::check_speech).
pub struct SpeakBuilder {
    kind: ExerciseKind,
}

impl SpeakBuilder {
    pub fn new(kind: ExerciseKind) -> Self {
        Self { kind }
    }

    fn payload<'a>(&self, exercise: &'a Exercise) -> Result<&'a Speak> {
        match (&exercise.body, self.kind) {
            (ExerciseBody::SpeakTerm(payload), ExerciseKind::SpeakTerm)
            | (ExerciseBody::SpeakSentence(payload), ExerciseKind::SpeakSentence) => Ok(payload),
            _ => Err(kind_mismatch(exercise, self.kind)),
        }
    }
}

impl ExerciseBuilder for SpeakBuilder {
    fn kind(&self) -> ExerciseKind {
        self.kind
    }

    fn build(&self, exercise: &Exercise, _rng: &mut dyn RngCore) -> Result<Prompt> {
        let payload = self.payload(exercise)?;
        Ok(Prompt::Speak {
            audio_url: payload.audio_url.clone(),
            phonetic: payload.phonetic.clone(),
            content: payload.answer.clone(),
        })
    }

    fn correct_answer(&self, exercise: &Exercise) -> Result<CorrectAnswer> {
        Ok(CorrectAnswer::Text(self.payload(exercise)?.answer.clone()))
    }

    fn assert_answer(&self, exercise: &Exercise, answer: &Answer) -> Result<bool> {
        let payload = self.payload(exercise)?;
        match answer {
            Answer::Transcription(text) => Ok(grade_transcription(&payload.answer, text).correct),
            other => Err(wrong_answer_shape(self.kind, other)),
        }
    }
}
