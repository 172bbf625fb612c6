//! Speech exercise API tests.
//!
//! The speech service is replaced by a scripted transcriber.

mod common;

use axum::body::Bytes;
use axum::http::StatusCode;
use axum_test::{TestResponse, TestServer};
use exercise_core::TranscriptionError;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use uuid::Uuid;

use common::fixtures;
use common::{authorized, TestContext};

async fn post_audio(server: &TestServer, path: &str, user: Uuid, audio: Vec<u8>) -> TestResponse {
    authorized(server.post(path), user)
        .add_query_param("time_to_answer", 3.5)
        .content_type("audio/wav")
        .bytes(Bytes::from(audio))
        .await
}

/// Test a close transcription is graded correct and recorded.
#[tokio::test]
async fn test_check_speech_correct() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let user = Uuid::new_v4();
    let exercise = ctx.seed(fixtures::speak_sentence(1)).await;
    ctx.transcriber.reply_with(Ok("i bike pizza"));

    let path = format!("/api/exercises/speak-sentence/{}/audio", exercise.id);
    let response = post_audio(&server, &path, user, fixtures::wav_silence(2.0)).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(
        body,
        json!({
            "correct": true,
            "correct_answer": "I like pizza",
            "user_transcription": "i bike pizza",
            "text_diff": [1],
        })
    );
    assert_eq!(ctx.transcriber.calls(), 1);

    let attempts = ctx.history.list_for_user(user, 10).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert!(attempts[0].correct);
    assert_eq!(attempts[0].response["user_transcription"], "i bike pizza");
    assert_eq!(attempts[0].request, json!({ "time_to_answer": 3.5 }));
}

/// Test a distant transcription is graded incorrect.
#[tokio::test]
async fn test_check_speech_incorrect() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let exercise = ctx.seed(fixtures::speak_sentence(2)).await;
    ctx.transcriber.reply_with(Ok("you eat pasta"));

    let path = format!("/api/exercises/speak-sentence/{}/audio", exercise.id);
    let body: Value = post_audio(&server, &path, Uuid::new_v4(), fixtures::wav_silence(1.0))
        .await
        .json();

    assert_eq!(body["correct"], false);
    assert_eq!(body["text_diff"], json!([0, 1, 2]));
}

/// Test recordings longer than the answer allows never reach the transcriber.
#[tokio::test]
async fn test_check_speech_audio_too_long() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let user = Uuid::new_v4();
    let exercise = ctx.seed(fixtures::speak_sentence(3)).await;
    ctx.transcriber.reply_with(Ok("I like pizza"));

    let path = format!("/api/exercises/speak-sentence/{}/audio", exercise.id);
    let response = post_audio(&server, &path, user, fixtures::wav_silence(6.0)).await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = response.json();
    assert_eq!(body["error"], "audio_too_long");
    assert_eq!(ctx.transcriber.calls(), 0);
    assert!(ctx.history.list_for_user(user, 10).await.unwrap().is_empty());
}

/// Test stereo and non-WAV uploads are unsupported.
#[tokio::test]
async fn test_check_speech_unsupported_audio() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let user = Uuid::new_v4();
    let exercise = ctx.seed(fixtures::speak_sentence(4)).await;
    let path = format!("/api/exercises/speak-sentence/{}/audio", exercise.id);

    let stereo = fixtures::wav(1, 2, 16, 16_000, 16_000);
    post_audio(&server, &path, user, stereo)
        .await
        .assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);

    post_audio(&server, &path, user, b"ID3 not a wav file".to_vec())
        .await
        .assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);

    assert_eq!(ctx.transcriber.calls(), 0);
}

/// Test an unavailable speech service is reported and nothing is recorded.
#[tokio::test]
async fn test_check_speech_service_unavailable() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let user = Uuid::new_v4();
    let exercise = ctx.seed(fixtures::speak_sentence(5)).await;
    ctx.transcriber.reply_with(Err(TranscriptionError::ServiceUnavailable(
        "connection refused".to_string(),
    )));

    let path = format!("/api/exercises/speak-sentence/{}/audio", exercise.id);
    let response = post_audio(&server, &path, user, fixtures::wav_silence(1.0)).await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ctx.transcriber.calls(), 1);
    assert!(ctx.history.list_for_user(user, 10).await.unwrap().is_empty());
}

/// Test silence that yields no words is a failed transcription.
#[tokio::test]
async fn test_check_speech_empty_transcription() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let user = Uuid::new_v4();
    let exercise = ctx.seed(fixtures::speak_sentence(6)).await;
    ctx.transcriber.reply_with(Ok("   "));

    let path = format!("/api/exercises/speak-sentence/{}/audio", exercise.id);
    let response = post_audio(&server, &path, user, fixtures::wav_silence(1.0)).await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["error"], "transcription_failed");
    assert!(ctx.history.list_for_user(user, 10).await.unwrap().is_empty());
}

/// Test the audio route only serves speech kinds and needs a body.
#[tokio::test]
async fn test_check_audio_bad_requests() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let user = Uuid::new_v4();
    let listen = ctx.seed(fixtures::listen_term(7)).await;
    let speak = ctx.seed(fixtures::speak_sentence(7)).await;

    let path = format!("/api/exercises/listen-term/{}/audio", listen.id);
    post_audio(&server, &path, user, fixtures::wav_silence(1.0))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let path = format!("/api/exercises/speak-sentence/{}/audio", speak.id);
    post_audio(&server, &path, user, Vec::new())
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    authorized(server.post(&path), user)
        .bytes(Bytes::from(fixtures::wav_silence(1.0)))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    assert_eq!(ctx.transcriber.calls(), 0);
}
