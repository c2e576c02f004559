// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation and message types shared by every Parley crate.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Arbitrary per-message metadata.
pub type Meta = serde_json::Map<String, serde_json::Value>;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`crate::PluginAdapter`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Sender,
}

/// Lifecycle state of a conversation.
///
/// `Active` is the only non-terminal state. `Expired` is reached only through
/// the maintenance sweep, from one of the three closed states.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Active,
    IdleTimeout,
    AgentClosed,
    UserClosed,
    Expired,
}

impl ConversationStatus {
    /// Whether a conversation may transition into this status via `close`.
    pub fn is_closing(self) -> bool {
        matches!(
            self,
            Self::IdleTimeout | Self::AgentClosed | Self::UserClosed
        )
    }
}

/// Kind of content a message carries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Audio,
    Image,
    Document,
    Template,
}

/// Who authored a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageOwner {
    User,
    Agent,
    Team,
}

/// A conversation between one client and the agent side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub client_hub: String,
    pub channel: String,
    pub status: ConversationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub idle_timeout_minutes: i64,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by_message: Option<String>,
}

impl Conversation {
    /// True when the conversation is ACTIVE but has been idle past its timeout.
    ///
    /// The boundary is exclusive: at exactly `last_activity_at + timeout` the
    /// conversation is still live. A deadline past the representable range
    /// never arrives.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if self.status != ConversationStatus::Active {
            return false;
        }
        TimeDelta::try_minutes(self.idle_timeout_minutes)
            .and_then(|timeout| self.last_activity_at.checked_add_signed(timeout))
            .is_some_and(|deadline| now > deadline)
    }
}

/// A persisted message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub message_type: MessageType,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub owner: MessageOwner,
    pub channel: String,
    pub meta: Meta,
    pub closes_conversation: bool,
}

/// Input for appending a message to a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageData {
    pub body: String,
    pub message_type: MessageType,
    pub owner: MessageOwner,
    /// Authored time. Filled from the clock when absent.
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub closes_conversation: bool,
    /// Defaults to the owning conversation's channel.
    pub channel: Option<String>,
}

impl MessageData {
    pub fn new(body: impl Into<String>, message_type: MessageType, owner: MessageOwner) -> Self {
        Self {
            body: body.into(),
            message_type,
            owner,
            timestamp: None,
            meta: Meta::new(),
            closes_conversation: false,
            channel: None,
        }
    }

    /// Shorthand for a text message.
    pub fn text(body: impl Into<String>, owner: MessageOwner) -> Self {
        Self::new(body, MessageType::Text, owner)
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Marks the message as explicitly closing its conversation.
    pub fn closing(mut self) -> Self {
        self.closes_conversation = true;
        self
    }
}

/// Aggregate counts over conversations, optionally scoped to one client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationStats {
    pub total_conversations: u64,
    pub active_conversations: u64,
    pub closed_by_timeout: u64,
    pub closed_by_agent: u64,
    pub closed_by_user: u64,
    pub expired: u64,
    pub total_messages: u64,
    pub average_messages_per_conversation: f64,
}

impl ConversationStats {
    /// Average messages per conversation rounded to two decimals, zero when empty.
    pub fn average(total_messages: u64, total_conversations: u64) -> f64 {
        if total_conversations == 0 {
            return 0.0;
        }
        let avg = total_messages as f64 / total_conversations as f64;
        (avg * 100.0).round() / 100.0
    }
}
