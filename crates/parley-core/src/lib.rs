// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Parley.
//!
//! This crate provides the conversation and message types, the error type,
//! the injectable clock, and the adapter traits implemented by the storage
//! and channel crates.

pub mod clock;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::ParleyError;
pub use types::{
    AdapterType, Conversation, ConversationStats, ConversationStatus, HealthStatus, Message,
    MessageData, MessageOwner, MessageType, Meta,
};

pub use traits::{ConversationStore, OutboundReply, PluginAdapter, ReplySender};
