// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};
use tower::ServiceExt;

use parley_channel::{ChannelAdapter, WebhookPayload, sign};
use parley_config::model::{ChannelConfig, ConversationConfig, StorageConfig};
use parley_core::{Clock, ConversationStatus, ConversationStore, ManualClock};
use parley_gateway::{GatewayState, router};
use parley_lifecycle::LifecycleEngine;
use parley_storage::SqliteStore;

struct Fixture {
    app: Router,
    engine: Arc<LifecycleEngine>,
    store: Arc<SqliteStore>,
    clock: Arc<ManualClock>,
    _dir: TempDir,
}

async fn setup_with_secret(app_secret: Option<&str>) -> Fixture {
    let dir = tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 5, 10, 9, 0, 0).unwrap(),
    ));
    let store = Arc::new(SqliteStore::with_clock(
        StorageConfig {
            database_path: dir.path().join("gateway.db").to_string_lossy().into_owned(),
            wal_mode: true,
        },
        clock.clone(),
    ));
    store.initialize().await.unwrap();
    let engine = Arc::new(LifecycleEngine::new(
        store.clone(),
        clock.clone(),
        ConversationConfig::default(),
    ));
    let state = GatewayState {
        webhook: Arc::new(ChannelAdapter::new(
            engine.clone(),
            "whatsapp",
            ChannelConfig::default(),
        )),
        local: Arc::new(ChannelAdapter::new(
            engine.clone(),
            "local",
            ChannelConfig::default(),
        )),
        engine: engine.clone(),
        verify_token: Some("verify-me".into()),
        app_secret: app_secret.map(String::from),
        start_time: Instant::now(),
    };
    Fixture {
        app: router(state),
        engine,
        store,
        clock,
        _dir: dir,
    }
}

async fn setup() -> Fixture {
    setup_with_secret(None).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn wait_for_messages(engine: &LifecycleEngine, client_hub: &str, count: usize) {
    for _ in 0..100 {
        if engine.history(client_hub, 10, true).await.unwrap().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("expected {count} messages for {client_hub}");
}

#[tokio::test]
async fn health_and_readiness() {
    let fx = setup().await;
    let (status, body) = send(&fx.app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&fx.app, get("/readiness")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn webhook_verification_handshake() {
    let fx = setup().await;
    let (status, body) = send(
        &fx.app,
        get("/webhook?hub.mode=subscribe&hub.challenge=1158201444&hub.verify_token=verify-me"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // The challenge is echoed as plain text, which also parses as a JSON number.
    assert_eq!(body, json!(1158201444));

    let (status, _) = send(
        &fx.app,
        get("/webhook?hub.mode=subscribe&hub.challenge=1&hub.verify_token=wrong"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&fx.app, get("/webhook?hub.challenge=1&hub.verify_token=verify-me")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn webhook_acknowledges_then_replies() {
    let fx = setup().await;
    let payload = WebhookPayload::text("user_42", "hello", fx.clock.now());
    let (status, body) = send(
        &fx.app,
        post_json("/webhook", &serde_json::to_value(&payload).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");
    let conversation_id = body["conversation_id"].as_str().unwrap().to_string();

    wait_for_messages(&fx.engine, "user_42", 2).await;
    let active = fx.store.find_active("user_42").await.unwrap().unwrap();
    assert_eq!(active.id, conversation_id);
    assert_eq!(active.channel, "whatsapp");
}

#[tokio::test]
async fn webhook_rejections_map_to_status_codes() {
    let fx = setup().await;

    let stale = WebhookPayload::text(
        "user_1",
        "old",
        fx.clock.now() - chrono::Duration::seconds(301),
    );
    let (status, body) = send(
        &fx.app,
        post_json("/webhook", &serde_json::to_value(&stale).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], "expired");
    assert_eq!(body["max_age_seconds"], 300);

    let empty = serde_json::to_value(WebhookPayload::empty()).unwrap();
    let (status, body) = send(&fx.app, post_json("/webhook", &empty)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "no_message");

    let blank = WebhookPayload::text("user_1", "", fx.clock.now());
    let (status, body) = send(
        &fx.app,
        post_json("/webhook", &serde_json::to_value(&blank).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "no_content");

    let (status, body) = send(&fx.app, post_json("/webhook", &json!({"entry": "nope"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("malformed"));

    assert_eq!(fx.store.stats(None).await.unwrap().total_conversations, 0);
}

#[tokio::test]
async fn webhook_signature_is_enforced_when_configured() {
    let fx = setup_with_secret(Some("app-secret")).await;
    let payload = serde_json::to_string(&WebhookPayload::text("user_3", "hi", fx.clock.now())).unwrap();

    let unsigned = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.clone()))
        .unwrap();
    let (status, body) = send(&fx.app, unsigned).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid webhook signature");

    let signed = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-hub-signature-256", sign("app-secret", payload.as_bytes()))
        .body(Body::from(payload))
        .unwrap();
    let (status, body) = send(&fx.app, signed).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");
}

#[tokio::test]
async fn local_endpoint_processes_synchronously() {
    let fx = setup().await;
    let (status, body) = send(
        &fx.app,
        post_json("/v1/local/messages", &json!({"user": "user_42", "message": "hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "processed");
    assert_eq!(body["response_text"], "Hi Local! I got your message: 'hello'");

    let (status, body) = send(
        &fx.app,
        post_json("/v1/local/messages", &json!({"user": "user_42", "kind": "image", "media_id": "pic"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "processed");

    let (status, _) = send(
        &fx.app,
        post_json("/v1/local/messages", &json!({"user": "user_42", "kind": "audio"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&fx.app, get("/v1/conversations/user_42/messages?limit=3")).await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1]["body"], "[image processed - id: pic]");
}

#[tokio::test]
async fn admin_routes_cover_lifecycle() {
    let fx = setup().await;

    let (status, _) = send(&fx.app, get("/v1/conversations/user_7")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(
        &fx.app,
        post_json("/v1/local/messages", &json!({"user": "user_7", "message": "hey"})),
    )
    .await;

    let (status, body) = send(&fx.app, get("/v1/conversations/user_7")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");
    let conversation_id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &fx.app,
        post_json("/v1/conversations/user_7/extend", &json!({"minutes": 30})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["extended"], true);

    let (status, _) = send(
        &fx.app,
        post_json("/v1/conversations/user_7/extend", &json!({"minutes": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&fx.app, get("/v1/stats?client_hub=user_7")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_conversations"], 1);
    assert_eq!(body["active_conversations"], 1);
    assert_eq!(body["total_messages"], 2);

    let (status, body) = send(
        &fx.app,
        post_json("/v1/conversations/user_7/close", &json!({"reason": "operator"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["closed"], true);

    let closed = fx.store.get(&conversation_id).await.unwrap().unwrap();
    assert_eq!(closed.status, ConversationStatus::UserClosed);
    assert_eq!(closed.closed_by_message.as_deref(), Some("operator"));

    let (_, body) = send(
        &fx.app,
        post_json("/v1/conversations/user_7/close", &json!({})),
    )
    .await;
    assert_eq!(body["closed"], false);

    let (_, body) = send(&fx.app, get("/v1/conversations/user_7/messages")).await;
    assert!(body["messages"].as_array().unwrap().is_empty());
    let (_, body) = send(
        &fx.app,
        get("/v1/conversations/user_7/messages?include_closed=true"),
    )
    .await;
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);
}
