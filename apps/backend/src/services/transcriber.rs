//! Speech-to-text backends

use std::time::Duration;

use async_trait::async_trait;
use exercise_core::{AudioClip, Language, Transcriber, TranscriptionError};
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;

/// Used when no transcription service is configured.
pub struct DisabledTranscriber;

#[async_trait]
impl Transcriber for DisabledTranscriber {
    async fn transcribe(
        &self,
        _audio: &AudioClip,
        _vocabulary: &[String],
        _language: Language,
    ) -> Result<String, TranscriptionError> {
        Err(TranscriptionError::ServiceUnavailable(
            "speech transcription is not configured".to_string(),
        ))
    }
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Client for an HTTP speech-to-text service.
///
/// The recording is posted as multipart form data with `file`, `language`
/// and a space separated `vocabulary`; the service answers `{"text": ...}`.
pub struct HttpTranscriber {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpTranscriber {
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(
        &self,
        audio: &AudioClip,
        vocabulary: &[String],
        language: Language,
    ) -> Result<String, TranscriptionError> {
        let file = Part::bytes(audio.bytes().to_vec())
            .file_name("answer.wav")
            .mime_str("audio/wav")
            .map_err(|e| TranscriptionError::Failed(e.to_string()))?;
        let form = Form::new()
            .part("file", file)
            .text("language", language.as_str())
            .text("vocabulary", vocabulary.join(" "));

        let mut request = self.client.post(&self.url).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let res = request
            .send()
            .await
            .map_err(|e| TranscriptionError::ServiceUnavailable(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let msg = format!("transcriber HTTP {status}: {body}");
            return Err(match status {
                StatusCode::UNSUPPORTED_MEDIA_TYPE => TranscriptionError::UnsupportedAudioFormat(msg),
                s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
                    TranscriptionError::ServiceUnavailable(msg)
                }
                _ => TranscriptionError::Failed(msg),
            });
        }

        let body: TranscriptionResponse = res
            .json()
            .await
            .map_err(|e| TranscriptionError::Failed(e.to_string()))?;
        Ok(body.text.trim().to_string())
    }
}

/// Bounds every call of the wrapped transcriber.
pub struct TimeoutTranscriber<T> {
    inner: T,
    timeout: Duration,
}

impl<T> TimeoutTranscriber<T> {
    pub fn new(inner: T, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<T: Transcriber> Transcriber for TimeoutTranscriber<T> {
    async fn transcribe(
        &self,
        audio: &AudioClip,
        vocabulary: &[String],
        language: Language,
    ) -> Result<String, TranscriptionError> {
        match tokio::time::timeout(
            self.timeout,
            self.inner.transcribe(audio, vocabulary, language),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "transcription timed out");
                Err(TranscriptionError::ServiceUnavailable(format!(
                    "no transcription within {:?}",
                    self.timeout
                )))
            }
        }
    }
}
