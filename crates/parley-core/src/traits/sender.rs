// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound delivery of generated replies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ParleyError;
use crate::traits::adapter::PluginAdapter;

/// A reply ready to leave the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundReply {
    /// Channel-native recipient address (phone number, user id).
    pub recipient: String,
    pub channel: String,
    pub conversation_id: String,
    pub body: String,
}

/// Delivers replies to the end user's channel.
///
/// Delivery happens after the reply is persisted; a delivery failure does
/// not roll back the stored message.
#[async_trait]
pub trait ReplySender: PluginAdapter {
    async fn send(&self, reply: &OutboundReply) -> Result<(), ParleyError>;
}
