// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for Parley.
//!
//! Serves the provider webhook, a synchronous local endpoint for testing
//! conversations by hand, and an admin API over the lifecycle engine.

pub mod handlers;
pub mod server;
pub mod webhook;

pub use server::{GatewayState, ServerConfig, router, start_server};
