//! Speech grading: audio inspection, transcription and fuzzy comparison.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::builder::{Answer, CheckResult, CorrectAnswer, ExerciseSession};
use crate::catalog::AttemptHistory;
use crate::error::{ExerciseError, Result};
use crate::exercise::Language;
use crate::text::{edit_distance, estimate_speech_seconds, normalize, word_diff};

/// Largest edit distance still graded as a correct pronunciation.
pub const SPEECH_DISTANCE_THRESHOLD: usize = 3;

/// Failure reported by a [`Transcriber`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptionError {
    #[error("unsupported audio format: {0}")]
    UnsupportedAudioFormat(String),

    #[error("transcription failed: {0}")]
    Failed(String),

    #[error("transcription service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<TranscriptionError> for ExerciseError {
    fn from(err: TranscriptionError) -> Self {
        match err {
            TranscriptionError::UnsupportedAudioFormat(msg) => Self::UnsupportedAudioFormat(msg),
            TranscriptionError::Failed(msg) => Self::TranscriptionFailed(msg),
            TranscriptionError::ServiceUnavailable(msg) => {
                Self::TranscriptionServiceUnavailable(msg)
            }
        }
    }
}

/// Speech-to-text engine.
///
/// `vocabulary` restricts recognition to the words the student is expected
/// to say.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        audio: &AudioClip,
        vocabulary: &[String],
        language: Language,
    ) -> std::result::Result<String, TranscriptionError>;
}

/// Outcome of comparing a transcription with the expected text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechVerdict {
    pub correct: bool,
    pub distance: usize,
    pub text_diff: BTreeSet<usize>,
}

pub fn grade_transcription(expected: &str, transcription: &str) -> SpeechVerdict {
    let distance = edit_distance(expected, transcription);
    SpeechVerdict {
        correct: distance <= SPEECH_DISTANCE_THRESHOLD,
        distance,
        text_diff: word_diff(expected, transcription),
    }
}

const WAVE_FORMAT_PCM: u16 = 1;

/// A validated mono 16-bit PCM WAV recording.
#[derive(Debug, Clone)]
pub struct AudioClip {
    bytes: Vec<u8>,
    sample_rate: u32,
    frames: u64,
}

fn unsupported(reason: &str) -> ExerciseError {
    ExerciseError::UnsupportedAudioFormat(reason.to_string())
}

fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

impl AudioClip {
    /// Parse a RIFF/WAVE file. Only PCM, one channel, 16 bits per sample.
    pub fn from_wav(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err(unsupported("not a WAV file"));
        }

        let mut format = None;
        let mut data_len = None;
        let mut offset = 12;
        while offset + 8 <= bytes.len() {
            let id = &bytes[offset..offset + 4];
            let size = read_u32(&bytes, offset + 4).unwrap_or(0) as usize;
            let body = offset + 8;

            match id {
                b"fmt " => {
                    let audio_format =
                        read_u16(&bytes, body).ok_or_else(|| unsupported("truncated fmt chunk"))?;
                    let channels = read_u16(&bytes, body + 2)
                        .ok_or_else(|| unsupported("truncated fmt chunk"))?;
                    let sample_rate = read_u32(&bytes, body + 4)
                        .ok_or_else(|| unsupported("truncated fmt chunk"))?;
                    let bits = read_u16(&bytes, body + 14)
                        .ok_or_else(|| unsupported("truncated fmt chunk"))?;
                    format = Some((audio_format, channels, sample_rate, bits));
                }
                b"data" => {
                    // Recorders streaming to disk may leave the size unset.
                    data_len = Some(size.min(bytes.len() - body));
                }
                _ => {}
            }

            // Chunks are word aligned.
            offset = body.saturating_add(size).saturating_add(size & 1);
        }

        let (audio_format, channels, sample_rate, bits) =
            format.ok_or_else(|| unsupported("missing fmt chunk"))?;
        if audio_format != WAVE_FORMAT_PCM {
            return Err(unsupported("audio must be PCM encoded"));
        }
        if channels != 1 {
            return Err(unsupported("audio must be mono"));
        }
        if bits != 16 {
            return Err(unsupported("audio must be 16-bit"));
        }
        if sample_rate == 0 {
            return Err(unsupported("sample rate must be positive"));
        }
        let data_len = data_len.ok_or_else(|| unsupported("missing data chunk"))?;

        Ok(Self {
            frames: (data_len / 2) as u64,
            sample_rate,
            bytes,
        })
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The whole WAV file, headers included.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Reject recordings longer than it takes to say `correct_answer`.
pub fn ensure_within_budget(clip: &AudioClip, correct_answer: &str) -> Result<()> {
    let max_secs = estimate_speech_seconds(correct_answer);
    let duration_secs = clip.duration_secs();
    if duration_secs > max_secs as f64 {
        return Err(ExerciseError::AudioTooLong {
            duration_secs,
            max_secs,
        });
    }
    Ok(())
}

impl ExerciseSession<'_> {
    /// Transcribe a recording, grade it and record the attempt.
    ///
    /// Nothing is recorded when the audio is rejected or transcription fails.
    pub async fn check_speech(
        &self,
        transcriber: &dyn Transcriber,
        history: &dyn AttemptHistory,
        user_id: Uuid,
        audio: Vec<u8>,
        request: Value,
    ) -> Result<CheckResult> {
        if !self.kind().is_speech() {
            return Err(ExerciseError::InvalidAnswerShape(format!(
                "{} is not answered with audio",
                self.kind()
            )));
        }
        let expected = match self.correct_answer()? {
            CorrectAnswer::Text(text) => text,
            other => {
                return Err(ExerciseError::InvalidAnswerShape(format!(
                    "cannot compare speech with {other:?}"
                )))
            }
        };

        let clip = AudioClip::from_wav(audio)?;
        ensure_within_budget(&clip, &expected)?;

        let vocabulary: Vec<String> = normalize(&expected)
            .split_whitespace()
            .map(String::from)
            .collect();
        let text = transcriber
            .transcribe(&clip, &vocabulary, self.exercise().language)
            .await?;
        if text.trim().is_empty() {
            return Err(ExerciseError::TranscriptionFailed(
                "no speech recognized".to_string(),
            ));
        }

        let correct = self.assert_answer(&Answer::Transcription(text.clone()))?;
        let result = CheckResult {
            correct,
            text_diff: Some(word_diff(&expected, &text)),
            correct_answer: CorrectAnswer::Text(expected),
            user_transcription: Some(text),
        };

        self.record(history, user_id, Value::Null, &result, request)
            .await?;
        Ok(result)
    }
}

#[cfg(test)]
pub(crate) mod wav {
    /// A mono 16-bit PCM WAV file of silence.
    pub fn silence(sample_rate: u32, frames: u32) -> Vec<u8> {
        encode(1, 1, 16, sample_rate, frames)
    }

    pub fn encode(format: u16, channels: u16, bits: u16, sample_rate: u32, frames: u32) -> Vec<u8> {
        let block_align = channels * bits / 8;
        let data_len = frames * block_align as u32;

        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&format.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&bits.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        out.resize(out.len() + data_len as usize, 0);
        out
    }
}
