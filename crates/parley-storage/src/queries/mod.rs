// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query functions. Each takes a [`crate::Database`] and runs its
//! statements inside a single `call` on the writer thread.

pub mod conversations;
pub mod messages;
