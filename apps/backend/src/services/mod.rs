pub mod exercise;
pub mod transcriber;

pub use exercise::ExerciseService;
pub use transcriber::{DisabledTranscriber, HttpTranscriber, TimeoutTranscriber};
