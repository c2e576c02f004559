// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full conversation stack (temp SQLite store,
//! manual clock, lifecycle engine, channel adapter) with scripted replies and
//! a recording sender.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use parley_channel::{ChannelAdapter, Outcome, UserDirectory, WebhookPayload};
use parley_config::model::{ChannelConfig, ConversationConfig, ParleyConfig, StorageConfig};
use parley_core::{Clock, ConversationStore, ManualClock, ParleyError};
use parley_lifecycle::LifecycleEngine;
use parley_storage::SqliteStore;

use crate::mock_replies::ScriptedReplies;
use crate::mock_sender::RecordingSender;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    conversation: ConversationConfig,
    channel: ChannelConfig,
    channel_name: String,
    start: DateTime<Utc>,
    directory: Option<Arc<dyn UserDirectory>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            conversation: ConversationConfig::default(),
            channel: ChannelConfig::default(),
            channel_name: "local".to_string(),
            start: Utc
                .with_ymd_and_hms(2026, 1, 15, 12, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
            directory: None,
        }
    }

    /// Set scripted agent replies. Without any, replies are "mock response".
    pub fn with_replies(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_conversation_config(mut self, config: ConversationConfig) -> Self {
        self.conversation = config;
        self
    }

    pub fn with_idle_timeout(mut self, minutes: i64) -> Self {
        self.conversation.idle_timeout_minutes = minutes;
        self
    }

    pub fn with_channel_config(mut self, config: ChannelConfig) -> Self {
        self.channel = config;
        self
    }

    pub fn with_channel_name(mut self, name: impl Into<String>) -> Self {
        self.channel_name = name.into();
        self
    }

    pub fn with_directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Initial reading of the manual clock.
    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, ParleyError> {
        let temp_dir = tempfile::TempDir::new().map_err(ParleyError::storage)?;
        let storage = StorageConfig {
            database_path: temp_dir
                .path()
                .join("test.db")
                .to_string_lossy()
                .into_owned(),
            wal_mode: true,
        };

        let clock = Arc::new(ManualClock::new(self.start));
        let store = Arc::new(SqliteStore::with_clock(storage.clone(), clock.clone()));
        store.initialize().await?;

        let engine = Arc::new(LifecycleEngine::new(
            store.clone(),
            clock.clone(),
            self.conversation.clone(),
        ));

        let replies = Arc::new(ScriptedReplies::with_responses(self.responses));
        let sender = Arc::new(RecordingSender::new());
        let mut adapter =
            ChannelAdapter::new(engine.clone(), self.channel_name, self.channel.clone())
                .with_replies(replies.clone())
                .with_sender(sender.clone());
        if let Some(directory) = self.directory {
            adapter = adapter.with_directory(directory);
        }

        let config = ParleyConfig {
            storage,
            conversation: self.conversation,
            channel: self.channel,
            ..ParleyConfig::default()
        };

        Ok(TestHarness {
            clock,
            store,
            engine,
            adapter: Arc::new(adapter),
            replies,
            sender,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with temp storage and a manual clock.
pub struct TestHarness {
    pub clock: Arc<ManualClock>,
    /// SQLite store (temp DB, cleaned up on drop).
    pub store: Arc<SqliteStore>,
    pub engine: Arc<LifecycleEngine>,
    pub adapter: Arc<ChannelAdapter>,
    pub replies: Arc<ScriptedReplies>,
    pub sender: Arc<RecordingSender>,
    pub config: ParleyConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Sends a text message authored now and waits for the full outcome.
    pub async fn send_text(&self, from: &str, body: &str) -> Outcome {
        self.adapter
            .process(&WebhookPayload::text(from, body, self.now()))
            .await
    }

    pub async fn send_payload(&self, payload: &WebhookPayload) -> Outcome {
        self.adapter.process(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_channel::OutcomeStatus;

    #[tokio::test]
    async fn send_text_round_trips_through_the_stack() {
        let harness = TestHarness::builder()
            .with_replies(vec!["test output".to_string()])
            .build()
            .await
            .unwrap();

        let outcome = harness.send_text("user_1", "hello world").await;
        assert_eq!(outcome.status, OutcomeStatus::Processed);
        assert_eq!(outcome.response_text.as_deref(), Some("test output"));
        assert_eq!(harness.replies.prompts().await, vec!["hello world"]);
        assert_eq!(harness.sender.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn temp_db_is_unique_per_harness() {
        let h1 = TestHarness::builder().build().await.unwrap();
        let h2 = TestHarness::builder().build().await.unwrap();

        h1.send_text("user_1", "msg1").await;
        let s1 = h1.store.stats(None).await.unwrap();
        let s2 = h2.store.stats(None).await.unwrap();
        assert_eq!(s1.total_conversations, 1);
        assert_eq!(s2.total_conversations, 0);
    }

    #[tokio::test]
    async fn builder_overrides_config() {
        let harness = TestHarness::builder()
            .with_idle_timeout(0)
            .with_channel_name("web")
            .build()
            .await
            .unwrap();
        assert_eq!(harness.config.conversation.idle_timeout_minutes, 0);
        assert_eq!(harness.adapter.channel(), "web");
    }
}
