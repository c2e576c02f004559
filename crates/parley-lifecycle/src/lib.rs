// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation lifecycle engine for Parley.
//!
//! [`LifecycleEngine`] decides whether an inbound message continues an
//! existing conversation or starts a new one, detects idle timeouts and
//! closing phrases, and guarantees messages only land in ACTIVE
//! conversations.

pub mod engine;
pub mod keywords;

pub use engine::{AppendOutcome, LifecycleEngine, Resolution, DEFAULT_FORCE_CLOSE_REASON};
pub use keywords::CloseKeywords;
