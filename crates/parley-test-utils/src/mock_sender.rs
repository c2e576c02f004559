// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply sender that captures outbound replies instead of delivering them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use parley_core::{
    AdapterType, HealthStatus, OutboundReply, ParleyError, PluginAdapter, ReplySender,
};

/// Captures every reply handed to it. Can be switched to fail delivery.
#[derive(Default)]
pub struct RecordingSender {
    sent: Arc<Mutex<Vec<OutboundReply>>>,
    failing: AtomicBool,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every reply passed to `send`, including failed deliveries.
    pub async fn sent(&self) -> Vec<OutboundReply> {
        self.sent.lock().await.clone()
    }

    /// Makes subsequent deliveries fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl PluginAdapter for RecordingSender {
    fn name(&self) -> &str {
        "recording-sender"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Sender
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl ReplySender for RecordingSender {
    async fn send(&self, reply: &OutboundReply) -> Result<(), ParleyError> {
        self.sent.lock().await.push(reply.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(ParleyError::channel("recording sender set to fail"));
        }
        Ok(())
    }
}
