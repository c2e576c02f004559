// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Parley.

use thiserror::Error;

use crate::types::ConversationStatus;

/// The primary error type used across the store, the lifecycle engine and
/// the channel adapters.
#[derive(Debug, Error)]
pub enum ParleyError {
    /// No conversation exists with the given identifier.
    #[error("conversation not found: {conversation_id}")]
    ConversationNotFound { conversation_id: String },

    /// The conversation exists but no longer accepts messages or transitions.
    #[error("conversation {conversation_id} is not active (status: {status})")]
    ConversationNotActive {
        conversation_id: String,
        status: ConversationStatus,
    },

    /// Message content failed validation (e.g. body too long).
    #[error("invalid message: {0}")]
    MessageValidation(String),

    /// The store refused to create a second ACTIVE conversation for a client.
    #[error("an active conversation already exists for {client_hub}")]
    ActiveConversationExists { client_hub: String },

    /// A caller supplied an argument outside the accepted domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Storage backend errors (connection failure, query failure, corrupt rows).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Channel errors (delivery failure, malformed payload, upstream rejection).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ParleyError {
    /// Wraps any error as a storage failure.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Storage {
            source: source.into(),
        }
    }

    /// Builds a channel error without an underlying cause.
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
            source: None,
        }
    }
}
