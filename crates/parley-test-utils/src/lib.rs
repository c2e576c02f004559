// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Parley integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic tests without external services.
//!
//! # Components
//!
//! - [`TestHarness`] - Full stack over a temp database and a manual clock
//! - [`ScriptedReplies`] - Reply generator with pre-configured responses
//! - [`RecordingSender`] - Sender that captures outbound replies

pub mod harness;
pub mod mock_replies;
pub mod mock_sender;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_replies::ScriptedReplies;
pub use mock_sender::RecordingSender;
