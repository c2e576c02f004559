// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable conversation and message storage.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Conversation, ConversationStats, ConversationStatus, Message, MessageData};

/// Storage backend for conversations and their messages.
///
/// Implementations must guarantee at most one [`ConversationStatus::Active`]
/// conversation per `client_hub`, rejecting a second concurrent insert with
/// [`ParleyError::ActiveConversationExists`]. The store performs no expiry
/// checks of its own; that belongs to the lifecycle engine.
#[async_trait]
pub trait ConversationStore: PluginAdapter {
    /// Prepares the backend (opens connections, runs migrations).
    async fn initialize(&self) -> Result<(), ParleyError>;

    /// Flushes pending writes and releases the backend.
    async fn close_store(&self) -> Result<(), ParleyError>;

    /// Loads a conversation by id.
    async fn get(&self, conversation_id: &str) -> Result<Option<Conversation>, ParleyError>;

    /// Returns the ACTIVE conversation for a client, expired or not.
    async fn find_active(&self, client_hub: &str) -> Result<Option<Conversation>, ParleyError>;

    /// Inserts a new ACTIVE conversation.
    async fn create(
        &self,
        client_hub: &str,
        channel: &str,
        idle_timeout_minutes: i64,
    ) -> Result<Conversation, ParleyError>;

    /// Moves an ACTIVE conversation into a closing status.
    async fn close(
        &self,
        conversation_id: &str,
        new_status: ConversationStatus,
        closing_message: Option<&str>,
    ) -> Result<(), ParleyError>;

    /// Persists a message and refreshes the conversation's activity time in
    /// one transaction.
    async fn append_message(
        &self,
        conversation_id: &str,
        data: MessageData,
    ) -> Result<Message, ParleyError>;

    /// The `limit` most recent messages of a client, oldest first.
    async fn history(
        &self,
        client_hub: &str,
        limit: usize,
        include_closed: bool,
    ) -> Result<Vec<Message>, ParleyError>;

    async fn stats(&self, client_hub: Option<&str>) -> Result<ConversationStats, ParleyError>;

    /// Adds minutes to the client's ACTIVE conversation. Returns false when
    /// there is none.
    async fn extend_timeout(&self, client_hub: &str, minutes: i64) -> Result<bool, ParleyError>;

    /// Marks closed conversations untouched for `older_than_days` as EXPIRED,
    /// at most `batch_size` of them. Returns the number marked.
    async fn sweep_stale(&self, older_than_days: i64, batch_size: usize)
    -> Result<usize, ParleyError>;

    /// All conversations of a client, newest first.
    async fn list_conversations(&self, client_hub: &str) -> Result<Vec<Conversation>, ParleyError>;
}
