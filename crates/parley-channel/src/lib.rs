// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapters for Parley.
//!
//! Parses WhatsApp-style webhook envelopes, admits or rejects each inbound
//! message, records it through the lifecycle engine and produces the agent's
//! reply.

pub mod adapter;
pub mod directory;
pub mod media;
pub mod outcome;
pub mod payload;
pub mod reply;
pub mod sender;
pub mod signature;

pub use adapter::{Admission, ChannelAdapter, PendingReply, REPLY_CONTEXT_LIMIT};
pub use directory::{AllowListDirectory, LocalUserDirectory, UserDirectory, UserProfile};
pub use media::{MediaInterpreter, PlaceholderMedia};
pub use outcome::{Outcome, OutcomeStatus};
pub use payload::{InboundRecord, MediaRef, RawTimestamp, RecordContent, WebhookPayload};
pub use reply::{CannedReplyGenerator, ReplyGenerator};
pub use sender::{LogSender, WhatsAppCloudSender};
pub use signature::{SIGNATURE_HEADER, sign, verify_signature};
