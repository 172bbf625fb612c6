//! Attempt history API tests.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use uuid::Uuid;

use common::fixtures;
use common::{authorized, TestContext};

/// Test history starts empty.
#[tokio::test]
async fn test_history_empty() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let user = Uuid::new_v4();

    let response = authorized(server.get("/api/history"), user).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!([]));

    let body: Value = authorized(server.get("/api/history/info"), user)
        .await
        .json();
    assert_eq!(body, json!({ "correct": 0, "incorrect": 0, "streak": 0 }));
}

/// Test attempts are listed newest first and summarized per user.
#[tokio::test]
async fn test_history_lists_and_summarizes_attempts() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let user = Uuid::new_v4();
    let other_user = Uuid::new_v4();
    let exercise = ctx.seed(fixtures::listen_term(1)).await;
    let path = format!("/api/exercises/listen-term/{}", exercise.id);

    for (answer, who) in [
        ("mouse", user),
        ("house", user),
        ("House.", user),
        ("house", other_user),
    ] {
        authorized(server.post(&path), who)
            .json(&fixtures::check_request(json!({ "content": answer })))
            .await
            .assert_status_ok();
    }

    let body: Value = authorized(server.get("/api/history"), user).await.json();
    let attempts = body.as_array().unwrap();
    assert_eq!(attempts.len(), 3);

    let answers: Vec<&str> = attempts
        .iter()
        .map(|a| a["response"]["content"].as_str().unwrap())
        .collect();
    assert_eq!(answers, vec!["House.", "house", "mouse"]);
    assert_eq!(attempts[2]["correct"], false);
    assert_eq!(attempts[0]["kind"], "listen-term");
    assert_eq!(attempts[0]["exercise_id"], json!(exercise.id));
    assert_eq!(attempts[0]["response"]["correct_answer"], "House");

    let body: Value = authorized(server.get("/api/history"), user)
        .add_query_param("limit", 1)
        .await
        .json();
    assert_eq!(body.as_array().unwrap().len(), 1);

    let body: Value = authorized(server.get("/api/history/info"), user)
        .await
        .json();
    assert_eq!(body, json!({ "correct": 2, "incorrect": 1, "streak": 2 }));
}

/// Test the statistic counts attempts inside the date range and filters.
#[tokio::test]
async fn test_history_statistic() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let user = Uuid::new_v4();
    let listen = ctx.seed(fixtures::listen_term(1)).await;
    let order = ctx.seed(fixtures::order_sentence(1)).await;

    for answer in ["house", "mouse", "house"] {
        authorized(server.post(&format!("/api/exercises/listen-term/{}", listen.id)), user)
            .json(&fixtures::check_request(json!({ "content": answer })))
            .await
            .assert_status_ok();
    }
    authorized(server.post(&format!("/api/exercises/order-sentence/{}", order.id)), user)
        .json(&fixtures::check_request(json!({ "sentence": ["pizza", "like", "I"] })))
        .await
        .assert_status_ok();

    let today = Utc::now().date_naive();
    let yesterday = today - Duration::days(1);

    let body: Value = authorized(server.get("/api/history/statistic"), user)
        .add_query_param("start_date", yesterday)
        .add_query_param("end_date", today)
        .await
        .json();
    assert_eq!(body, json!({ "correct": 2, "incorrect": 2 }));

    let body: Value = authorized(server.get("/api/history/statistic"), user)
        .add_query_param("start_date", today)
        .add_query_param("end_date", today)
        .add_query_param("type", "listen-term")
        .add_query_param("language", "en-US")
        .await
        .json();
    assert_eq!(body, json!({ "correct": 2, "incorrect": 1 }));

    // order_sentence is the only A1 fixture
    let body: Value = authorized(server.get("/api/history/statistic"), user)
        .add_query_param("start_date", today)
        .add_query_param("end_date", today)
        .add_query_param("level", "A1")
        .await
        .json();
    assert_eq!(body, json!({ "correct": 0, "incorrect": 1 }));

    let body: Value = authorized(server.get("/api/history/statistic"), user)
        .add_query_param("start_date", yesterday)
        .add_query_param("end_date", yesterday)
        .await
        .json();
    assert_eq!(body, json!({ "correct": 0, "incorrect": 0 }));

    let body: Value = authorized(server.get("/api/history/statistic"), Uuid::new_v4())
        .add_query_param("start_date", today)
        .add_query_param("end_date", today)
        .await
        .json();
    assert_eq!(body, json!({ "correct": 0, "incorrect": 0 }));
}

/// Test inverted, missing and unknown statistic parameters are rejected.
#[tokio::test]
async fn test_history_statistic_bad_requests() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let user = Uuid::new_v4();
    let today = Utc::now().date_naive();

    let response = authorized(server.get("/api/history/statistic"), user)
        .add_query_param("start_date", today)
        .add_query_param("end_date", today - Duration::days(1))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "bad_request");

    authorized(server.get("/api/history/statistic"), user)
        .add_query_param("start_date", today)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    authorized(server.get("/api/history/statistic"), user)
        .add_query_param("start_date", today)
        .add_query_param("end_date", today)
        .add_query_param("type", "dance")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .get("/api/history/statistic")
        .add_query_param("start_date", today)
        .add_query_param("end_date", today)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}
