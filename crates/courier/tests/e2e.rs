// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the complete relay pipeline.
//!
//! Each test creates an isolated TestHarness with temp SQLite, the in-process
//! cache and mock collaborators, then drives it through HTTP only.

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use courier_config::SignatureScheme;
use courier_core::{MessageStatus, MessageStore};
use courier_test_utils::TestHarness;
use serde_json::{Value, json};
use tower::ServiceExt;

const MESSAGES: &str = "/webhooks/whatsapp/messages";
const STATUS: &str = "/webhooks/whatsapp/status";

async fn post_webhook(harness: &TestHarness, path: &str, params: &[(&str, &str)]) -> StatusCode {
    harness
        .router()
        .oneshot(harness.webhook_request(path, params))
        .await
        .unwrap()
        .status()
}

async fn get_json(harness: &TestHarness, uri: &str) -> (StatusCode, Value) {
    let response = harness
        .router()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn send(harness: &TestHarness, body: Value) -> Value {
    let response = harness
        .router()
        .oneshot(
            Request::post("/api/v1/messages/send")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

// ---- Inbound pipeline ----

#[tokio::test]
async fn inbound_message_is_persisted_attributed_and_relayed() {
    let harness = TestHarness::builder()
        .with_webhook_secret("s3cret", SignatureScheme::Twilio)
        .build()
        .await
        .unwrap();

    let status = post_webhook(
        &harness,
        MESSAGES,
        &[
            ("MessageSid", "SM1"),
            ("From", "whatsapp:+551199990000"),
            ("To", "whatsapp:+14155238886"),
            ("Body", "oi"),
            ("NumMedia", "0"),
            ("ProfileName", "Ana"),
            ("WaId", "551199990000"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let message = harness
        .store
        .get_message_by_provider_id("SM1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.status, MessageStatus::Delivered);
    assert_eq!(message.content, "oi");

    let user = harness
        .store
        .get_user_by_phone("+551199990000")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.profile_name.as_deref(), Some("Ana"));
    assert_eq!(message.user_id.as_deref(), Some(user.id.as_str()));

    assert!(harness.drain().await);
    let relayed = harness.relay.requests().await;
    assert_eq!(relayed.len(), 1);
    assert_eq!(relayed[0].content, "oi");
    assert!(harness.analyzer.requests().await.is_empty());
}

#[tokio::test]
async fn redelivered_webhook_is_idempotent() {
    let harness = TestHarness::builder().build().await.unwrap();
    let params = [("MessageSid", "SM7"), ("From", "+15550001111"), ("Body", "again")];

    assert_eq!(post_webhook(&harness, MESSAGES, &params).await, StatusCode::OK);
    assert_eq!(post_webhook(&harness, MESSAGES, &params).await, StatusCode::OK);

    assert!(harness.drain().await);
    assert_eq!(harness.message_count().await, 1);
    assert_eq!(harness.relay.requests().await.len(), 1);
}

#[tokio::test]
async fn exhausted_retries_never_affect_the_acknowledgment() {
    let harness = TestHarness::builder()
        .with_max_attempts(2)
        .build()
        .await
        .unwrap();
    harness.relay.fail_next(10).await;

    let status = post_webhook(
        &harness,
        MESSAGES,
        &[("MessageSid", "SM8"), ("From", "+15550001111"), ("Body", "lost")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert!(harness.drain().await);
    assert_eq!(harness.relay.calls().await, 2);
    assert!(harness.relay.requests().await.is_empty());
    assert_eq!(harness.message_count().await, 1);
}

// ---- Outbound lifecycle ----

#[tokio::test]
async fn outbound_status_lifecycle_is_monotonic() {
    let harness = TestHarness::builder().build().await.unwrap();
    let sent = send(&harness, json!({"to": "+15550001111", "content": "hello"})).await;
    let id = sent["id"].as_str().unwrap().to_string();
    let sid = sent["twilio_sid"].as_str().unwrap().to_string();
    let uri = format!("/api/v1/messages/{id}");

    // Warm the cache so later reads prove invalidation.
    let (_, message) = get_json(&harness, &uri).await;
    assert_eq!(message["status"], "sent");

    for (reported, expected) in [
        ("delivered", "delivered"),
        ("sent", "delivered"),
        ("read", "read"),
        ("failed", "read"),
    ] {
        let status = post_webhook(
            &harness,
            STATUS,
            &[("MessageSid", sid.as_str()), ("MessageStatus", reported)],
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, message) = get_json(&harness, &uri).await;
        assert_eq!(message["status"], expected, "after reporting {reported}");
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn failure_without_code_after_delivery_is_ignored() {
    let harness = TestHarness::builder().build().await.unwrap();
    let sent = send(&harness, json!({"to": "+15550001111", "content": "hello"})).await;
    let sid = sent["twilio_sid"].as_str().unwrap().to_string();

    for reported in ["delivered", "undelivered"] {
        let status = post_webhook(
            &harness,
            STATUS,
            &[("MessageSid", sid.as_str()), ("MessageStatus", reported)],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let message = harness
        .store
        .get_message_by_provider_id(&sid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.status, MessageStatus::Delivered);
    assert!(message.error_code.is_none());
    assert!(logs_contain("status update ignored"));
}

#[tokio::test]
async fn error_code_forces_failure() {
    let harness = TestHarness::builder().build().await.unwrap();
    let sent = send(&harness, json!({"to": "+15550001111", "content": "hello"})).await;
    let sid = sent["twilio_sid"].as_str().unwrap().to_string();

    post_webhook(
        &harness,
        STATUS,
        &[
            ("MessageSid", sid.as_str()),
            ("MessageStatus", "delivered"),
            ("ErrorCode", "63016"),
            ("ErrorMessage", "outside the allowed window"),
        ],
    )
    .await;

    let message = harness
        .store
        .get_message_by_provider_id(&sid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.status, MessageStatus::Failed);
    assert_eq!(message.error_code.as_deref(), Some("63016"));
}

#[tokio::test]
async fn media_send_carries_url_to_provider() {
    let harness = TestHarness::builder().build().await.unwrap();
    let sent = send(
        &harness,
        json!({
            "to": "whatsapp:+15550001111",
            "type": "image",
            "media_url": "https://cdn.example.com/cat.jpg",
            "content": "look"
        }),
    )
    .await;

    let (status, message) = get_json(
        &harness,
        &format!("/api/v1/messages/{}", sent["id"].as_str().unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(message["type"], "image");
    assert_eq!(message["media_url"], "https://cdn.example.com/cat.jpg");
    assert_eq!(harness.messenger.sent().await.len(), 1);
}

#[tokio::test]
async fn conversation_listing_includes_both_directions() {
    let harness = TestHarness::builder().build().await.unwrap();
    post_webhook(
        &harness,
        MESSAGES,
        &[("MessageSid", "SM9"), ("From", "whatsapp:+15550001111"), ("Body", "question")],
    )
    .await;
    send(&harness, json!({"to": "+15550001111", "content": "answer"})).await;
    send(&harness, json!({"to": "+15559999999", "content": "elsewhere"})).await;

    let (status, list) = get_json(&harness, "/api/v1/messages?phone=%2B15550001111").await;
    assert_eq!(status, StatusCode::OK);
    let messages = list["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);

    let (_, all) = get_json(&harness, "/api/v1/messages?limit=1").await;
    assert_eq!(all["messages"].as_array().unwrap().len(), 1);
    assert_eq!(all["limit"], 1);
}
