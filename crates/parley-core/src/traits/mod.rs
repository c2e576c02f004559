// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod sender;
pub mod store;

pub use adapter::PluginAdapter;
pub use sender::{OutboundReply, ReplySender};
pub use store::ConversationStore;
