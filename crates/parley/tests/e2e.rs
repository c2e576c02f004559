// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end conversation journeys through the assembled stack.

use std::time::Instant;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::Duration;
use parley_channel::{OutcomeStatus, WebhookPayload};
use parley_core::{ConversationStatus, ConversationStore, MessageData, MessageOwner, ParleyError};
use parley_gateway::{GatewayState, router};
use parley_test_utils::TestHarness;
use tower::ServiceExt;

#[tokio::test]
async fn agent_close_then_new_conversation() {
    let harness = TestHarness::builder()
        .with_replies(vec![
            "Sure, one moment.".to_string(),
            "Support finished, see you next time!".to_string(),
            "Welcome back!".to_string(),
        ])
        .build()
        .await
        .unwrap();

    let first = harness.send_text("user_1", "hi").await;
    assert_eq!(first.status, OutcomeStatus::Processed);
    let first_id = first.conversation_id.clone().unwrap();

    let second = harness.send_text("user_1", "thanks, that is all").await;
    assert_eq!(second.status, OutcomeStatus::Processed);
    assert_eq!(second.conversation_id.as_deref(), Some(first_id.as_str()));

    let closed = harness.store.get(&first_id).await.unwrap().unwrap();
    assert_eq!(closed.status, ConversationStatus::AgentClosed);
    assert_eq!(
        closed.closed_by_message.as_deref(),
        Some("Support finished, see you next time!")
    );
    assert!(closed.closed_at.is_some());

    let third = harness.send_text("user_1", "hello again").await;
    assert_eq!(third.status, OutcomeStatus::Processed);
    assert_ne!(third.conversation_id.as_deref(), Some(first_id.as_str()));
    assert_eq!(third.response_text.as_deref(), Some("Welcome back!"));

    let stats = harness.engine.stats(Some("user_1")).await.unwrap();
    assert_eq!(stats.total_conversations, 2);
    assert_eq!(stats.active_conversations, 1);
    assert_eq!(stats.closed_by_agent, 1);
    assert_eq!(stats.total_messages, 6);
    assert_eq!(harness.sender.sent().await.len(), 3);
}

#[tokio::test]
async fn idle_conversation_times_out_on_next_contact() {
    let harness = TestHarness::builder()
        .with_idle_timeout(0)
        .build()
        .await
        .unwrap();

    let first = harness.send_text("user_1", "hi").await;
    let first_id = first.conversation_id.unwrap();

    harness.advance(Duration::seconds(1));
    let resolution = harness
        .engine
        .resolve_or_create("user_1", "local", None)
        .await
        .unwrap();
    assert!(resolution.was_created);
    assert_ne!(resolution.conversation_id, first_id);

    let old = harness.store.get(&first_id).await.unwrap().unwrap();
    assert_eq!(old.status, ConversationStatus::IdleTimeout);
    assert!(old.closed_at.is_some());
}

#[tokio::test]
async fn append_to_unknown_conversation_is_not_found() {
    let harness = TestHarness::builder().build().await.unwrap();

    let result = harness
        .engine
        .append("does-not-exist", MessageData::text("hello", MessageOwner::User))
        .await;
    assert!(matches!(
        result,
        Err(ParleyError::ConversationNotFound { .. })
    ));
}

#[tokio::test]
async fn stale_inbound_message_changes_nothing() {
    let harness = TestHarness::builder().build().await.unwrap();

    let sent_at = harness.now() - Duration::seconds(301);
    let outcome = harness
        .send_payload(&WebhookPayload::text("user_1", "are you there?", sent_at))
        .await;

    assert_eq!(outcome.status, OutcomeStatus::Expired);
    assert_eq!(outcome.max_age_seconds, Some(300));
    assert!(outcome.conversation_id.is_none());

    let stats = harness.engine.stats(None).await.unwrap();
    assert_eq!(stats.total_conversations, 0);
    assert_eq!(stats.total_messages, 0);
    assert!(harness.replies.prompts().await.is_empty());
    assert!(harness.sender.sent().await.is_empty());
}

#[tokio::test]
async fn concurrent_messages_share_one_conversation() {
    let harness = TestHarness::builder().build().await.unwrap();

    let sends = (0..6).map(|i| {
        let adapter = harness.adapter.clone();
        let payload = WebhookPayload::text("user_4", &format!("message {i}"), harness.now());
        async move { adapter.process(&payload).await }
    });
    let outcomes = futures::future::join_all(sends).await;

    assert!(
        outcomes
            .iter()
            .all(|outcome| outcome.status == OutcomeStatus::Processed)
    );
    let conversations = harness.engine.conversations("user_4").await.unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].status, ConversationStatus::Active);

    let history = harness.engine.history("user_4", 100, false).await.unwrap();
    assert_eq!(history.len(), 12);
}

#[tokio::test]
async fn user_close_keyword_keeps_conversation_open() {
    let harness = TestHarness::builder()
        .with_replies(vec!["Anything else?".to_string()])
        .build()
        .await
        .unwrap();

    let outcome = harness.send_text("user_2", "/close").await;
    assert_eq!(outcome.status, OutcomeStatus::Processed);

    let active = harness
        .engine
        .active_conversation("user_2")
        .await
        .unwrap()
        .expect("conversation stays active");
    assert_eq!(Some(active.id), outcome.conversation_id);

    let history = harness.engine.history("user_2", 10, false).await.unwrap();
    assert!(history.iter().all(|message| !message.closes_conversation));
}

#[tokio::test]
async fn force_close_and_reopen_through_engine() {
    let harness = TestHarness::builder().build().await.unwrap();

    let first = harness.send_text("user_3", "hello").await;
    assert!(
        harness
            .engine
            .force_close("user_3", Some("operator request"))
            .await
            .unwrap()
    );
    let closed = harness
        .store
        .get(first.conversation_id.as_deref().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(closed.status, ConversationStatus::UserClosed);

    let second = harness.send_text("user_3", "hello again").await;
    assert_ne!(second.conversation_id, first.conversation_id);

    let all = harness.engine.history("user_3", 10, true).await.unwrap();
    assert_eq!(all.len(), 4);
    let active_only = harness.engine.history("user_3", 10, false).await.unwrap();
    assert_eq!(active_only.len(), 2);
}

#[tokio::test]
async fn webhook_ack_then_reply_is_delivered() {
    let harness = TestHarness::builder()
        .with_replies(vec!["On it.".to_string()])
        .build()
        .await
        .unwrap();
    let app = router(GatewayState {
        webhook: harness.adapter.clone(),
        local: harness.adapter.clone(),
        engine: harness.engine.clone(),
        verify_token: None,
        app_secret: None,
        start_time: Instant::now(),
    });

    let payload = WebhookPayload::text("user_5", "my order is late", harness.now());
    let response = app
        .oneshot(
            Request::post("/webhook")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let ack: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(ack["status"], "accepted");

    let mut sent = Vec::new();
    for _ in 0..100 {
        sent = harness.sender.sent().await;
        if !sent.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].body, "On it.");
    assert_eq!(sent[0].recipient, "user_5");
    assert_eq!(ack["conversation_id"], sent[0].conversation_id.as_str());
}
