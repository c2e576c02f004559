// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning audio and image messages into text.

use async_trait::async_trait;
use parley_core::ParleyError;

use crate::payload::MediaRef;

/// Produces a textual body for non-text inbound messages.
#[async_trait]
pub trait MediaInterpreter: Send + Sync + 'static {
    async fn transcribe_audio(&self, media: &MediaRef) -> Result<String, ParleyError>;

    async fn describe_image(&self, media: &MediaRef) -> Result<String, ParleyError>;
}

/// Stand-in interpreter that records which media was received.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderMedia;

#[async_trait]
impl MediaInterpreter for PlaceholderMedia {
    async fn transcribe_audio(&self, media: &MediaRef) -> Result<String, ParleyError> {
        Ok(format!("[audio transcribed - id: {}]", media.id))
    }

    async fn describe_image(&self, media: &MediaRef) -> Result<String, ParleyError> {
        Ok(format!("[image processed - id: {}]", media.id))
    }
}
