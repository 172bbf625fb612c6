use rand::RngCore;

use super::{kind_mismatch, wrong_answer_shape, Answer, CorrectAnswer, ExerciseBuilder, Prompt};
use crate::error::Result;
use crate::exercise::{ChoiceSource, Exercise, ExerciseBody, ExerciseKind, TermId};
use crate::sampler::{sample_choices, shuffle_map, ChoiceMap};

/// Distractors shown next to the correct choice.
pub const CHOICE_DISTRACTORS: usize = 3;

/// What the student looks at while choosing.
enum Cue<'a> {
    Content(&'a str),
    Audio(&'a str),
    Image(&'a str),
}

/// Everything a multiple-choice prompt is assembled from.
struct ChoiceParts<'a> {
    correct_id: TermId,
    correct_display: &'a str,
    distractors: &'a ChoiceSource,
    cue: Cue<'a>,
}

/// Pick the correct choice among four. Serves every `*-mchoice` kind.
pub struct MultipleChoiceBuilder {
    kind: ExerciseKind,
}

impl MultipleChoiceBuilder {
    pub fn new(kind: ExerciseKind) -> Self {
        Self { kind }
    }

    fn parts<'a>(&self, exercise: &'a Exercise) -> Result<ChoiceParts<'a>> {
        let term = exercise.term_reference;
        let parts = match (&exercise.body, self.kind) {
            (ExerciseBody::ListenTermMchoice(p), ExerciseKind::ListenTermMchoice) => ChoiceParts {
                correct_id: term,
                correct_display: &p.audio_url,
                distractors: &p.distractors,
                cue: Cue::Content(&p.content),
            },
            (ExerciseBody::TermSentenceMchoice(p), ExerciseKind::TermSentenceMchoice) => {
                ChoiceParts {
                    correct_id: term,
                    correct_display: &p.answer,
                    distractors: &p.distractors,
                    cue: Cue::Content(&p.sentence),
                }
            }
            (ExerciseBody::TermDefinitionMchoice(p), ExerciseKind::TermDefinitionMchoice) => {
                ChoiceParts {
                    correct_id: p.term_definition_id,
                    correct_display: &p.answer,
                    distractors: &p.distractors,
                    cue: Cue::Content(&p.content),
                }
            }
            (ExerciseBody::TermImageMchoice(p), ExerciseKind::TermImageMchoice) => ChoiceParts {
                correct_id: term,
                correct_display: &p.image_url,
                distractors: &p.distractors,
                cue: Cue::Audio(&p.audio_url),
            },
            (ExerciseBody::TermImageTextMchoice(p), ExerciseKind::TermImageTextMchoice) => {
                ChoiceParts {
                    correct_id: term,
                    correct_display: &p.answer,
                    distractors: &p.distractors,
                    cue: Cue::Image(&p.image_url),
                }
            }
            _ => return Err(kind_mismatch(exercise, self.kind)),
        };
        Ok(parts)
    }
}

impl ExerciseBuilder for MultipleChoiceBuilder {
    fn kind(&self) -> ExerciseKind {
        self.kind
    }

    fn build(&self, exercise: &Exercise, rng: &mut dyn RngCore) -> Result<Prompt> {
        let parts = self.parts(exercise)?;

        let mut choices = sample_choices(parts.distractors, CHOICE_DISTRACTORS, rng)?;
        choices.insert(parts.correct_id, parts.correct_display);
        let choices: ChoiceMap = shuffle_map(choices, rng);

        Ok(match parts.cue {
            Cue::Content(content) => Prompt::TextChoice {
                choices,
                content: content.to_string(),
            },
            Cue::Audio(audio_url) => Prompt::ImageChoice {
                choices,
                audio_url: audio_url.to_string(),
            },
            Cue::Image(image_url) => Prompt::TextImageChoice {
                choices,
                image_url: image_url.to_string(),
            },
        })
    }

    fn correct_answer(&self, exercise: &Exercise) -> Result<CorrectAnswer> {
        Ok(CorrectAnswer::Choice(self.parts(exercise)?.correct_id))
    }

    fn assert_answer(&self, exercise: &Exercise, answer: &Answer) -> Result<bool> {
        let parts = self.parts(exercise)?;
        match answer {
            Answer::Choice(id) => Ok(*id == parts.correct_id),
            other => Err(wrong_answer_shape(self.kind, other)),
        }
    }
}
