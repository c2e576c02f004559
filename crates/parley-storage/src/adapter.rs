// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the ConversationStore trait.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::TimeDelta;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use parley_config::model::{MAX_IDLE_TIMEOUT_MINUTES, StorageConfig};
use parley_core::{
    AdapterType, Clock, Conversation, ConversationStats, ConversationStatus, ConversationStore,
    HealthStatus, Message, MessageData, ParleyError, PluginAdapter, SystemClock,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed conversation store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
/// The database is opened by [`ConversationStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    clock: Arc<dyn Clock>,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a store reading wall-clock time.
    pub fn new(config: StorageConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a store stamping rows with times from `clock`.
    pub fn with_clock(config: StorageConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, ParleyError> {
        self.db.get().ok_or_else(|| ParleyError::Storage {
            source: "store not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("store not initialized".into()));
        };
        let ping = db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch("SELECT 1;") })
            .await;
        Ok(match ping {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        if self.db.get().is_some() {
            self.close_store().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn initialize(&self) -> Result<(), ParleyError> {
        let path = self.config.database_path.clone();
        let db = Database::open_with(&path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| ParleyError::Storage {
            source: "store already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    async fn close_store(&self) -> Result<(), ParleyError> {
        self.db()?.close().await
    }

    async fn get(&self, conversation_id: &str) -> Result<Option<Conversation>, ParleyError> {
        queries::conversations::get_conversation(self.db()?, conversation_id).await
    }

    async fn find_active(&self, client_hub: &str) -> Result<Option<Conversation>, ParleyError> {
        queries::conversations::find_active(self.db()?, client_hub).await
    }

    async fn create(
        &self,
        client_hub: &str,
        channel: &str,
        idle_timeout_minutes: i64,
    ) -> Result<Conversation, ParleyError> {
        if !(0..=MAX_IDLE_TIMEOUT_MINUTES).contains(&idle_timeout_minutes) {
            return Err(ParleyError::InvalidArgument(format!(
                "idle_timeout_minutes must be between 0 and {MAX_IDLE_TIMEOUT_MINUTES}, got {idle_timeout_minutes}"
            )));
        }
        let conversation = queries::conversations::insert_conversation(
            self.db()?,
            client_hub,
            channel,
            idle_timeout_minutes,
            self.clock.now(),
        )
        .await?;
        debug!(
            conversation_id = %conversation.id,
            client_hub,
            channel,
            "conversation row inserted"
        );
        Ok(conversation)
    }

    async fn close(
        &self,
        conversation_id: &str,
        new_status: ConversationStatus,
        closing_message: Option<&str>,
    ) -> Result<(), ParleyError> {
        if !new_status.is_closing() {
            return Err(ParleyError::InvalidArgument(format!(
                "cannot close a conversation into status {new_status}"
            )));
        }
        queries::conversations::close_conversation(
            self.db()?,
            conversation_id,
            new_status,
            closing_message,
            self.clock.now(),
        )
        .await
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        data: MessageData,
    ) -> Result<Message, ParleyError> {
        queries::messages::insert_message(self.db()?, conversation_id, data, self.clock.now())
            .await
    }

    async fn history(
        &self,
        client_hub: &str,
        limit: usize,
        include_closed: bool,
    ) -> Result<Vec<Message>, ParleyError> {
        queries::messages::history(self.db()?, client_hub, limit, include_closed).await
    }

    async fn stats(&self, client_hub: Option<&str>) -> Result<ConversationStats, ParleyError> {
        queries::conversations::stats(self.db()?, client_hub).await
    }

    async fn extend_timeout(&self, client_hub: &str, minutes: i64) -> Result<bool, ParleyError> {
        queries::conversations::extend_timeout(self.db()?, client_hub, minutes, self.clock.now())
            .await
    }

    async fn sweep_stale(
        &self,
        older_than_days: i64,
        batch_size: usize,
    ) -> Result<usize, ParleyError> {
        let db = self.db()?;
        let now = self.clock.now();
        let cutoff = TimeDelta::try_days(older_than_days)
            .and_then(|age| now.checked_sub_signed(age))
            .ok_or_else(|| {
                ParleyError::InvalidArgument(format!(
                    "older_than_days out of range, got {older_than_days}"
                ))
            })?;
        let candidates = queries::conversations::stale_candidates(db, cutoff, batch_size).await?;

        let mut expired = 0;
        for id in &candidates {
            match queries::conversations::mark_expired(db, id, now).await {
                Ok(true) => expired += 1,
                Ok(false) => debug!(conversation_id = %id, "sweep: conversation changed underneath"),
                Err(e) => warn!(conversation_id = %id, error = %e, "sweep: failed to expire conversation"),
            }
        }
        if expired > 0 {
            info!(expired, older_than_days, "marked stale conversations as expired");
        }
        Ok(expired)
    }

    async fn list_conversations(&self, client_hub: &str) -> Result<Vec<Conversation>, ParleyError> {
        queries::conversations::list_conversations(self.db()?, client_hub).await
    }
}
