// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wires the store, the lifecycle engine and the channel adapters from
//! configuration.

use std::sync::Arc;

use parley_channel::{
    AllowListDirectory, ChannelAdapter, LocalUserDirectory, LogSender, UserDirectory,
    WhatsAppCloudSender,
};
use parley_config::model::ParleyConfig;
use parley_core::{ConversationStore, ParleyError, ReplySender, SystemClock};
use parley_lifecycle::LifecycleEngine;
use parley_storage::SqliteStore;
use tracing::info;

/// Channel tag of the provider webhook.
pub const WHATSAPP_CHANNEL: &str = "whatsapp";
/// Channel tag of the local harness (CLI and `/v1/local/messages`).
pub const LOCAL_CHANNEL: &str = "local";

/// The running service components.
pub struct Stack {
    pub config: ParleyConfig,
    pub store: Arc<SqliteStore>,
    pub engine: Arc<LifecycleEngine>,
}

impl Stack {
    /// Opens the database and builds the engine on the system clock.
    pub async fn open(config: ParleyConfig) -> Result<Self, ParleyError> {
        let clock = Arc::new(SystemClock);
        let store = Arc::new(SqliteStore::with_clock(config.storage.clone(), clock.clone()));
        store.initialize().await?;
        let engine = Arc::new(LifecycleEngine::new(
            store.clone(),
            clock,
            config.conversation.clone(),
        ));
        Ok(Self {
            config,
            store,
            engine,
        })
    }

    /// Adapter for local testing: every sender is a known user and replies
    /// are only logged.
    pub fn local_adapter(&self) -> ChannelAdapter {
        ChannelAdapter::new(self.engine.clone(), LOCAL_CHANNEL, self.config.channel.clone())
            .with_directory(Arc::new(LocalUserDirectory))
    }

    /// Adapter for the provider webhook.
    ///
    /// Senders are checked against `whatsapp.allowed_users` when the list is
    /// non-empty. Replies go to the Cloud API when credentials are set.
    pub fn webhook_adapter(&self) -> Result<ChannelAdapter, ParleyError> {
        let whatsapp = &self.config.whatsapp;
        let directory: Arc<dyn UserDirectory> = if whatsapp.allowed_users.is_empty() {
            Arc::new(LocalUserDirectory)
        } else {
            Arc::new(AllowListDirectory::new(&whatsapp.allowed_users))
        };
        let sender: Arc<dyn ReplySender> = if whatsapp.api_token.is_some() {
            Arc::new(WhatsAppCloudSender::new(whatsapp)?)
        } else {
            info!("whatsapp.api_token not set, replies will only be logged");
            Arc::new(LogSender)
        };
        info!(
            allowed_users = whatsapp.allowed_users.len(),
            sender = sender.name(),
            "webhook adapter ready"
        );
        Ok(
            ChannelAdapter::new(self.engine.clone(), WHATSAPP_CHANNEL, self.config.channel.clone())
                .with_directory(directory)
                .with_sender(sender),
        )
    }

    pub async fn close(&self) -> Result<(), ParleyError> {
        self.store.close_store().await
    }
}
