// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle engine tests against a real SQLite store and a manual clock.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use tempfile::{tempdir, TempDir};
use tracing_test::traced_test;

use parley_config::model::{
    ConversationConfig, MAX_CLEANUP_DAYS, MAX_IDLE_TIMEOUT_MINUTES, StorageConfig,
};
use parley_core::{
    ConversationStatus, ConversationStore, ManualClock, MessageData, MessageOwner, ParleyError,
};
use parley_lifecycle::{LifecycleEngine, DEFAULT_FORCE_CLOSE_REASON};
use parley_storage::SqliteStore;

struct Fixture {
    engine: Arc<LifecycleEngine>,
    store: Arc<SqliteStore>,
    clock: Arc<ManualClock>,
    _dir: TempDir,
}

async fn setup_with(config: ConversationConfig) -> Fixture {
    let dir = tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 5, 10, 9, 0, 0).unwrap(),
    ));
    let store = Arc::new(SqliteStore::with_clock(
        StorageConfig {
            database_path: dir.path().join("engine.db").to_string_lossy().into_owned(),
            wal_mode: true,
        },
        clock.clone(),
    ));
    store.initialize().await.unwrap();
    let engine = Arc::new(LifecycleEngine::new(store.clone(), clock.clone(), config));
    Fixture {
        engine,
        store,
        clock,
        _dir: dir,
    }
}

async fn setup() -> Fixture {
    setup_with(ConversationConfig::default()).await
}

#[tokio::test]
async fn resolve_reuses_live_conversation() {
    let fx = setup().await;
    let first = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();
    assert!(first.was_created);

    fx.clock.advance(Duration::seconds(90));
    let second = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();
    assert!(!second.was_created);
    assert_eq!(first.conversation_id, second.conversation_id);
}

#[tokio::test]
async fn resolve_rejects_blank_arguments() {
    let fx = setup().await;
    for (hub, channel) in [("", "web"), ("user_1", " ")] {
        let err = fx.engine.resolve_or_create(hub, channel, None).await.unwrap_err();
        assert!(matches!(err, ParleyError::InvalidArgument(_)));
    }
    let err = fx
        .engine
        .resolve_or_create("user_1", "web", Some(-5))
        .await
        .unwrap_err();
    assert!(matches!(err, ParleyError::InvalidArgument(_)));
}

#[tokio::test]
async fn custom_timeout_applies_to_new_conversation() {
    let fx = setup().await;
    let res = fx
        .engine
        .resolve_or_create("user_1", "web", Some(30))
        .await
        .unwrap();
    let conv = fx.store.get(&res.conversation_id).await.unwrap().unwrap();
    assert_eq!(conv.idle_timeout_minutes, 30);
}

#[tokio::test]
#[traced_test]
async fn idle_conversation_is_replaced() {
    let fx = setup().await;
    let old = fx.engine.resolve_or_create("user_1", "web", Some(0)).await.unwrap();
    fx.clock.advance(Duration::seconds(1));

    let new = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();
    assert!(new.was_created);
    assert_ne!(old.conversation_id, new.conversation_id);

    let old = fx.store.get(&old.conversation_id).await.unwrap().unwrap();
    assert_eq!(old.status, ConversationStatus::IdleTimeout);
    assert!(old.closed_at.is_some());
    assert!(old.closed_by_message.is_none());
    assert!(logs_contain("conversation closed by idle timeout"));
}

#[tokio::test]
async fn timeout_boundary_is_exclusive() {
    let fx = setup().await;
    let first = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();
    fx.clock.advance(Duration::minutes(2));
    let same = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();
    assert_eq!(first.conversation_id, same.conversation_id);

    fx.clock.advance(Duration::milliseconds(1));
    let fresh = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();
    assert_ne!(first.conversation_id, fresh.conversation_id);
}

#[tokio::test]
async fn activity_pushes_the_timeout_forward() {
    let fx = setup().await;
    let res = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();
    for _ in 0..3 {
        fx.clock.advance(Duration::seconds(100));
        fx.engine
            .append(&res.conversation_id, MessageData::text("still here", MessageOwner::User))
            .await
            .unwrap();
    }
    let again = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();
    assert_eq!(res.conversation_id, again.conversation_id);
}

#[tokio::test]
async fn concurrent_resolution_yields_one_conversation() {
    let fx = setup().await;
    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let engine = fx.engine.clone();
            tokio::spawn(async move { engine.resolve_or_create("user_7", "web", None).await })
        })
        .collect();

    let resolutions: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    let first_id = &resolutions[0].conversation_id;
    assert!(resolutions.iter().all(|r| &r.conversation_id == first_id));
    assert_eq!(resolutions.iter().filter(|r| r.was_created).count(), 1);
    assert_eq!(fx.store.list_conversations("user_7").await.unwrap().len(), 1);
}

#[tokio::test]
async fn agent_keyword_closes_conversation() {
    let fx = setup().await;
    let res = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();

    let outcome = fx
        .engine
        .append(
            &res.conversation_id,
            MessageData::text("Thanks! CONVERSATION ENDED.", MessageOwner::Agent),
        )
        .await
        .unwrap();
    assert!(outcome.conversation_closed);
    assert!(outcome.message.closes_conversation);

    let conv = fx.store.get(&res.conversation_id).await.unwrap().unwrap();
    assert_eq!(conv.status, ConversationStatus::AgentClosed);
    assert_eq!(
        conv.closed_by_message.as_deref(),
        Some("Thanks! CONVERSATION ENDED.")
    );

    let err = fx
        .engine
        .append(&res.conversation_id, MessageData::text("hello?", MessageOwner::User))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ParleyError::ConversationNotActive {
            status: ConversationStatus::AgentClosed,
            ..
        }
    ));
}

#[tokio::test]
async fn explicit_flag_closes_for_agent_only() {
    let fx = setup().await;
    let res = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();

    let user = fx
        .engine
        .append(
            &res.conversation_id,
            MessageData::text("please close", MessageOwner::User).closing(),
        )
        .await
        .unwrap();
    assert!(!user.conversation_closed);
    assert!(!user.message.closes_conversation);

    let agent = fx
        .engine
        .append(
            &res.conversation_id,
            MessageData::text("done here", MessageOwner::Agent).closing(),
        )
        .await
        .unwrap();
    assert!(agent.conversation_closed);
}

#[tokio::test]
async fn user_and_team_keywords_never_close() {
    let fx = setup().await;
    let res = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();
    for owner in [MessageOwner::User, MessageOwner::Team] {
        let outcome = fx
            .engine
            .append(&res.conversation_id, MessageData::text("/end", owner))
            .await
            .unwrap();
        assert!(!outcome.conversation_closed);
        assert!(!outcome.message.closes_conversation);
    }
    let conv = fx.store.get(&res.conversation_id).await.unwrap().unwrap();
    assert_eq!(conv.status, ConversationStatus::Active);
}

#[tokio::test]
async fn append_to_unknown_conversation_fails() {
    let fx = setup().await;
    let err = fx
        .engine
        .append("does-not-exist", MessageData::text("hi", MessageOwner::User))
        .await
        .unwrap_err();
    assert!(matches!(err, ParleyError::ConversationNotFound { .. }));
}

#[tokio::test]
async fn append_to_idle_conversation_times_it_out() {
    let fx = setup().await;
    let res = fx.engine.resolve_or_create("user_1", "web", Some(1)).await.unwrap();
    fx.clock.advance(Duration::minutes(2));

    let err = fx
        .engine
        .append(&res.conversation_id, MessageData::text("late", MessageOwner::User))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ParleyError::ConversationNotActive {
            status: ConversationStatus::IdleTimeout,
            ..
        }
    ));
    let conv = fx.store.get(&res.conversation_id).await.unwrap().unwrap();
    assert_eq!(conv.status, ConversationStatus::IdleTimeout);
    assert!(fx.engine.history("user_1", 10, true).await.unwrap().is_empty());
}

#[tokio::test]
async fn overlong_body_is_rejected_without_side_effects() {
    let fx = setup_with(ConversationConfig {
        max_message_length: 5,
        ..ConversationConfig::default()
    })
    .await;
    let res = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();

    // Length counts characters, not bytes.
    fx.engine
        .append(&res.conversation_id, MessageData::text("ações", MessageOwner::User))
        .await
        .unwrap();
    let err = fx
        .engine
        .append(&res.conversation_id, MessageData::text("/end now", MessageOwner::Agent))
        .await
        .unwrap_err();
    assert!(matches!(err, ParleyError::MessageValidation(_)));

    let conv = fx.store.get(&res.conversation_id).await.unwrap().unwrap();
    assert_eq!(conv.status, ConversationStatus::Active);
    assert_eq!(fx.engine.history("user_1", 10, false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn append_fills_missing_timestamp_from_clock() {
    let fx = setup().await;
    let res = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();
    fx.clock.advance(Duration::seconds(5));
    let outcome = fx
        .engine
        .append(&res.conversation_id, MessageData::text("hi", MessageOwner::User))
        .await
        .unwrap();
    assert_eq!(
        outcome.message.timestamp,
        Utc.with_ymd_and_hms(2026, 5, 10, 9, 0, 5).unwrap()
    );
}

#[tokio::test]
async fn history_is_capped_by_configuration() {
    let fx = setup_with(ConversationConfig {
        max_history: 3,
        ..ConversationConfig::default()
    })
    .await;
    let res = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();
    for i in 0..5 {
        fx.clock.advance(Duration::seconds(1));
        fx.engine
            .append(&res.conversation_id, MessageData::text(format!("m{i}"), MessageOwner::User))
            .await
            .unwrap();
    }
    let history = fx.engine.history("user_1", 100, false).await.unwrap();
    let bodies: Vec<_> = history.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, vec!["m2", "m3", "m4"]);
    assert!(fx.engine.history("user_1", 0, false).await.unwrap().is_empty());
}

#[tokio::test]
async fn force_close_marks_user_closed() {
    let fx = setup().await;
    assert!(!fx.engine.force_close("user_1", None).await.unwrap());

    let res = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();
    assert!(fx.engine.force_close("user_1", None).await.unwrap());
    let conv = fx.store.get(&res.conversation_id).await.unwrap().unwrap();
    assert_eq!(conv.status, ConversationStatus::UserClosed);
    assert_eq!(conv.closed_by_message.as_deref(), Some(DEFAULT_FORCE_CLOSE_REASON));

    let res = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();
    assert!(fx.engine.force_close("user_1", Some("customer asked")).await.unwrap());
    let conv = fx.store.get(&res.conversation_id).await.unwrap().unwrap();
    assert_eq!(conv.closed_by_message.as_deref(), Some("customer asked"));
}

#[tokio::test]
async fn force_close_on_idle_conversation_reports_timeout_instead() {
    let fx = setup().await;
    let res = fx.engine.resolve_or_create("user_1", "web", Some(0)).await.unwrap();
    fx.clock.advance(Duration::seconds(1));
    assert!(!fx.engine.force_close("user_1", None).await.unwrap());
    let conv = fx.store.get(&res.conversation_id).await.unwrap().unwrap();
    assert_eq!(conv.status, ConversationStatus::IdleTimeout);
}

#[tokio::test]
async fn extend_timeout_keeps_conversation_alive() {
    let fx = setup().await;
    let res = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();
    fx.clock.advance(Duration::minutes(1));
    assert!(fx.engine.extend_timeout("user_1", 10).await.unwrap());

    fx.clock.advance(Duration::minutes(10));
    let same = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();
    assert_eq!(res.conversation_id, same.conversation_id);

    let err = fx.engine.extend_timeout("user_1", 0).await.unwrap_err();
    assert!(matches!(err, ParleyError::InvalidArgument(_)));
    assert!(!fx.engine.extend_timeout("user_2", 5).await.unwrap());
}

#[tokio::test]
async fn oversized_durations_are_rejected_without_side_effects() {
    let fx = setup().await;
    let err = fx
        .engine
        .resolve_or_create("user_1", "web", Some(i64::MAX))
        .await
        .unwrap_err();
    assert!(matches!(err, ParleyError::InvalidArgument(_)));

    let res = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();
    for minutes in [10_000_000_000_000, i64::MAX, MAX_IDLE_TIMEOUT_MINUTES] {
        let err = fx.engine.extend_timeout("user_1", minutes).await.unwrap_err();
        assert!(matches!(err, ParleyError::InvalidArgument(_)), "minutes = {minutes}");
    }
    let conv = fx.store.get(&res.conversation_id).await.unwrap().unwrap();
    assert_eq!(conv.idle_timeout_minutes, 2);

    let same = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();
    assert_eq!(same.conversation_id, res.conversation_id);

    for days in [1_000_000_000, i64::MAX, MAX_CLEANUP_DAYS + 1] {
        let err = fx.engine.sweep_stale(Some(days), None).await.unwrap_err();
        assert!(matches!(err, ParleyError::InvalidArgument(_)), "days = {days}");
    }
    assert_eq!(fx.engine.sweep_stale(Some(MAX_CLEANUP_DAYS), None).await.unwrap(), 0);
}

#[tokio::test]
async fn extend_timeout_does_not_revive_idle_conversation() {
    let fx = setup().await;
    fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();
    fx.clock.advance(Duration::minutes(5));
    assert!(!fx.engine.extend_timeout("user_1", 10).await.unwrap());
    assert!(fx.engine.active_conversation("user_1").await.unwrap().is_none());
}

#[tokio::test]
async fn stats_apply_lazy_expiry_for_a_client() {
    let fx = setup().await;
    fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();
    fx.clock.advance(Duration::minutes(3));

    let stats = fx.engine.stats(Some("user_1")).await.unwrap();
    assert_eq!(stats.active_conversations, 0);
    assert_eq!(stats.closed_by_timeout, 1);
}

#[tokio::test]
async fn sweep_uses_configured_defaults() {
    let fx = setup_with(ConversationConfig {
        cleanup_days_old: 7,
        cleanup_batch_size: 1,
        ..ConversationConfig::default()
    })
    .await;
    for hub in ["user_1", "user_2"] {
        fx.engine.resolve_or_create(hub, "web", None).await.unwrap();
        fx.engine.force_close(hub, None).await.unwrap();
    }
    fx.clock.advance(Duration::days(8));

    assert_eq!(fx.engine.sweep_stale(None, None).await.unwrap(), 1);
    assert_eq!(fx.engine.sweep_stale(None, Some(10)).await.unwrap(), 1);
    assert_eq!(fx.engine.stats(None).await.unwrap().expired, 2);
    assert!(fx.engine.sweep_stale(Some(-1), None).await.is_err());
}

#[tokio::test]
async fn closed_then_resolved_starts_fresh() {
    let fx = setup().await;
    let first = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();
    fx.engine
        .append(&first.conversation_id, MessageData::text("/end", MessageOwner::Agent))
        .await
        .unwrap();
    let next = fx.engine.resolve_or_create("user_1", "web", None).await.unwrap();
    assert!(next.was_created);
    assert_ne!(first.conversation_id, next.conversation_id);

    let conversations = fx.engine.conversations("user_1").await.unwrap();
    assert_eq!(conversations.len(), 2);
    assert_eq!(conversations[0].id, next.conversation_id);
}
