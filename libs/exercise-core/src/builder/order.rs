use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use super::{kind_mismatch, wrong_answer_shape, Answer, CorrectAnswer, ExerciseBuilder, Prompt};
use crate::error::Result;
use crate::exercise::{Exercise, ExerciseBody, ExerciseKind, OrderSentence};

/// Reassemble a sentence from shuffled tokens.
///
/// The prompt mixes the sentence tokens with between one and all of the
/// distractor tokens. Grading is exact, case and punctuation included.
pub struct OrderSentenceBuilder;

impl OrderSentenceBuilder {
    fn payload<'a>(&self, exercise: &'a Exercise) -> Result<&'a OrderSentence> {
        match &exercise.body {
            ExerciseBody::OrderSentence(payload) => Ok(payload),
            _ => Err(kind_mismatch(exercise, self.kind())),
        }
    }
}

impl ExerciseBuilder for OrderSentenceBuilder {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::OrderSentence
    }

    fn build(&self, exercise: &Exercise, rng: &mut dyn RngCore) -> Result<Prompt> {
        let payload = self.payload(exercise)?;

        let mut tokens = payload.sentence.clone();
        if !payload.distractors.is_empty() {
            let count = rng.gen_range(1..=payload.distractors.len());
            tokens.extend(payload.distractors.choose_multiple(rng, count).cloned());
        }
        tokens.shuffle(rng);

        Ok(Prompt::OrderSentence { sentence: tokens })
    }

    fn correct_answer(&self, exercise: &Exercise) -> Result<CorrectAnswer> {
        Ok(CorrectAnswer::Sentence(self.payload(exercise)?.sentence.clone()))
    }

    fn assert_answer(&self, exercise: &Exercise, answer: &Answer) -> Result<bool> {
        let payload = self.payload(exercise)?;
        match answer {
            Answer::Sentence(sentence) => Ok(*sentence == payload.sentence),
            other => Err(wrong_answer_shape(self.kind(), other)),
        }
    }
}
