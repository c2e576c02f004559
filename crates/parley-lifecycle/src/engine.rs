// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation state machine.
//!
//! Conversations start ACTIVE and leave it exactly once:
//! - ACTIVE -> IDLE_TIMEOUT, lazily, the next time anything resolves or
//!   appends to a conversation idle past its timeout
//! - ACTIVE -> AGENT_CLOSED, when an agent message carries the close flag or
//!   a close keyword
//! - ACTIVE -> USER_CLOSED, through [`LifecycleEngine::force_close`]
//!
//! The maintenance sweep later moves closed conversations to EXPIRED.
//! Expiry is always evaluated before a message is attached, so no message
//! ever lands in a conversation that had already timed out.

use std::sync::Arc;

use parley_config::model::{ConversationConfig, MAX_CLEANUP_DAYS, MAX_IDLE_TIMEOUT_MINUTES};
use parley_core::{
    Clock, Conversation, ConversationStats, ConversationStatus, ConversationStore, Message,
    MessageData, MessageOwner, ParleyError,
};
use tracing::{debug, info, warn};

use crate::keywords::CloseKeywords;

/// Reason recorded when an operator force-closes without giving one.
pub const DEFAULT_FORCE_CLOSE_REASON: &str = "closed manually";

/// Result of [`LifecycleEngine::resolve_or_create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub conversation_id: String,
    pub was_created: bool,
}

/// Result of [`LifecycleEngine::append`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppendOutcome {
    pub message: Message,
    /// True when this message closed the conversation.
    pub conversation_closed: bool,
}

/// Owns the lifecycle rules on top of a [`ConversationStore`].
pub struct LifecycleEngine {
    store: Arc<dyn ConversationStore>,
    clock: Arc<dyn Clock>,
    config: ConversationConfig,
    keywords: CloseKeywords,
}

impl LifecycleEngine {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        clock: Arc<dyn Clock>,
        config: ConversationConfig,
    ) -> Self {
        let keywords = CloseKeywords::new(&config.close_keywords);
        Self {
            store,
            clock,
            config,
            keywords,
        }
    }

    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Closes `conversation` as IDLE_TIMEOUT if it has idled past its
    /// timeout. Returns it back only while it is still live.
    async fn expire_if_idle(
        &self,
        conversation: Conversation,
    ) -> Result<Option<Conversation>, ParleyError> {
        if !conversation.is_expired_at(self.clock.now()) {
            return Ok(Some(conversation));
        }
        match self
            .store
            .close(&conversation.id, ConversationStatus::IdleTimeout, None)
            .await
        {
            Ok(()) => info!(
                conversation_id = %conversation.id,
                client_hub = %conversation.client_hub,
                idle_timeout_minutes = conversation.idle_timeout_minutes,
                "conversation closed by idle timeout"
            ),
            // Someone else closed it first; it is gone either way.
            Err(ParleyError::ConversationNotActive { .. }) => debug!(
                conversation_id = %conversation.id,
                "idle conversation already closed"
            ),
            Err(e) => return Err(e),
        }
        Ok(None)
    }

    /// Returns the live ACTIVE conversation of a client, closing it first if
    /// it has timed out.
    pub async fn active_conversation(
        &self,
        client_hub: &str,
    ) -> Result<Option<Conversation>, ParleyError> {
        match self.store.find_active(client_hub).await? {
            Some(conversation) => self.expire_if_idle(conversation).await,
            None => Ok(None),
        }
    }

    /// Finds the client's live conversation or opens a new one.
    ///
    /// `timeout_minutes` applies only to a newly created conversation and
    /// defaults to the configured idle timeout. If a concurrent caller wins
    /// the race to create, the call retries once and returns the winner.
    pub async fn resolve_or_create(
        &self,
        client_hub: &str,
        channel: &str,
        timeout_minutes: Option<i64>,
    ) -> Result<Resolution, ParleyError> {
        if client_hub.trim().is_empty() {
            return Err(ParleyError::InvalidArgument("client_hub must not be empty".into()));
        }
        if channel.trim().is_empty() {
            return Err(ParleyError::InvalidArgument("channel must not be empty".into()));
        }
        let timeout = timeout_minutes.unwrap_or(self.config.idle_timeout_minutes);
        if !(0..=MAX_IDLE_TIMEOUT_MINUTES).contains(&timeout) {
            return Err(ParleyError::InvalidArgument(format!(
                "timeout_minutes must be between 0 and {MAX_IDLE_TIMEOUT_MINUTES}, got {timeout}"
            )));
        }

        let mut retried = false;
        loop {
            if let Some(conversation) = self.active_conversation(client_hub).await? {
                debug!(conversation_id = %conversation.id, client_hub, "reusing active conversation");
                return Ok(Resolution {
                    conversation_id: conversation.id,
                    was_created: false,
                });
            }

            match self.store.create(client_hub, channel, timeout).await {
                Ok(conversation) => {
                    info!(
                        conversation_id = %conversation.id,
                        client_hub,
                        channel,
                        idle_timeout_minutes = timeout,
                        "conversation created"
                    );
                    return Ok(Resolution {
                        conversation_id: conversation.id,
                        was_created: true,
                    });
                }
                Err(ParleyError::ActiveConversationExists { .. }) if !retried => {
                    debug!(client_hub, "lost conversation creation race, retrying");
                    retried = true;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Appends a message to an ACTIVE conversation and applies the close rule.
    ///
    /// A message from the agent closes the conversation when it carries the
    /// explicit flag or contains a close keyword; the flag is ignored for
    /// other owners.
    pub async fn append(
        &self,
        conversation_id: &str,
        mut data: MessageData,
    ) -> Result<AppendOutcome, ParleyError> {
        let conversation = self.store.get(conversation_id).await?.ok_or_else(|| {
            ParleyError::ConversationNotFound {
                conversation_id: conversation_id.to_string(),
            }
        })?;
        if conversation.status != ConversationStatus::Active {
            return Err(ParleyError::ConversationNotActive {
                conversation_id: conversation.id,
                status: conversation.status,
            });
        }
        if self.expire_if_idle(conversation).await?.is_none() {
            return Err(ParleyError::ConversationNotActive {
                conversation_id: conversation_id.to_string(),
                status: ConversationStatus::IdleTimeout,
            });
        }

        let length = data.body.chars().count();
        if length > self.config.max_message_length {
            return Err(ParleyError::MessageValidation(format!(
                "message body is {length} characters, limit is {}",
                self.config.max_message_length
            )));
        }

        let closes = data.owner == MessageOwner::Agent
            && (data.closes_conversation || self.keywords.matches(&data.body));
        data.closes_conversation = closes;
        data.timestamp.get_or_insert_with(|| self.clock.now());

        let message = self.store.append_message(conversation_id, data).await?;
        debug!(
            conversation_id,
            message_id = %message.id,
            owner = %message.owner,
            "message appended"
        );

        let mut conversation_closed = false;
        if closes {
            match self
                .store
                .close(
                    conversation_id,
                    ConversationStatus::AgentClosed,
                    Some(&message.body),
                )
                .await
            {
                Ok(()) => {
                    conversation_closed = true;
                    info!(conversation_id, "conversation closed by agent");
                }
                Err(ParleyError::ConversationNotActive { status, .. }) => warn!(
                    conversation_id,
                    %status,
                    "closing message stored but conversation was already closed"
                ),
                Err(e) => return Err(e),
            }
        }

        Ok(AppendOutcome {
            message,
            conversation_closed,
        })
    }

    /// The most recent messages of a client, oldest first, capped at the
    /// configured maximum.
    pub async fn history(
        &self,
        client_hub: &str,
        limit: usize,
        include_closed: bool,
    ) -> Result<Vec<Message>, ParleyError> {
        self.active_conversation(client_hub).await?;
        let limit = limit.min(self.config.max_history);
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.store.history(client_hub, limit, include_closed).await
    }

    pub async fn stats(&self, client_hub: Option<&str>) -> Result<ConversationStats, ParleyError> {
        if let Some(client_hub) = client_hub {
            self.active_conversation(client_hub).await?;
        }
        self.store.stats(client_hub).await
    }

    /// All conversations of a client, newest first.
    pub async fn conversations(&self, client_hub: &str) -> Result<Vec<Conversation>, ParleyError> {
        self.active_conversation(client_hub).await?;
        self.store.list_conversations(client_hub).await
    }

    /// Closes the client's live conversation as USER_CLOSED. Returns false
    /// when there is nothing to close.
    pub async fn force_close(
        &self,
        client_hub: &str,
        reason: Option<&str>,
    ) -> Result<bool, ParleyError> {
        let Some(conversation) = self.active_conversation(client_hub).await? else {
            return Ok(false);
        };
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_FORCE_CLOSE_REASON);
        match self
            .store
            .close(&conversation.id, ConversationStatus::UserClosed, Some(reason))
            .await
        {
            Ok(()) => {
                info!(conversation_id = %conversation.id, client_hub, reason, "conversation force-closed");
                Ok(true)
            }
            Err(ParleyError::ConversationNotActive { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Gives the client's live conversation `minutes` more before it times
    /// out. Returns false when the client has no live conversation. The
    /// resulting timeout may not exceed [`MAX_IDLE_TIMEOUT_MINUTES`].
    pub async fn extend_timeout(&self, client_hub: &str, minutes: i64) -> Result<bool, ParleyError> {
        if !(1..=MAX_IDLE_TIMEOUT_MINUTES).contains(&minutes) {
            return Err(ParleyError::InvalidArgument(format!(
                "minutes must be between 1 and {MAX_IDLE_TIMEOUT_MINUTES}, got {minutes}"
            )));
        }
        let Some(conversation) = self.active_conversation(client_hub).await? else {
            return Ok(false);
        };
        let total = conversation.idle_timeout_minutes.checked_add(minutes);
        if total.is_none_or(|total| total > MAX_IDLE_TIMEOUT_MINUTES) {
            return Err(ParleyError::InvalidArgument(format!(
                "extending {} by {minutes} minutes exceeds {MAX_IDLE_TIMEOUT_MINUTES}",
                conversation.id
            )));
        }
        let extended = self.store.extend_timeout(client_hub, minutes).await?;
        if extended {
            info!(client_hub, minutes, "conversation timeout extended");
        }
        Ok(extended)
    }

    /// Marks old closed conversations EXPIRED, using the configured age and
    /// batch size unless overridden.
    pub async fn sweep_stale(
        &self,
        older_than_days: Option<i64>,
        batch_size: Option<usize>,
    ) -> Result<usize, ParleyError> {
        let days = older_than_days.unwrap_or(self.config.cleanup_days_old);
        let batch = batch_size.unwrap_or(self.config.cleanup_batch_size);
        if !(0..=MAX_CLEANUP_DAYS).contains(&days) {
            return Err(ParleyError::InvalidArgument(format!(
                "older_than_days must be between 0 and {MAX_CLEANUP_DAYS}, got {days}"
            )));
        }
        self.store.sweep_stale(days, batch).await
    }
}
