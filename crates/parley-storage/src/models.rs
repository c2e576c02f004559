// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite and the core conversation types.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC text with nanosecond
//! precision, so lexical order equals chronological order and values
//! round-trip exactly.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use parley_core::{Conversation, Message, Meta};
use rusqlite::Row;
use rusqlite::types::Type;

/// Column list matching [`conversation_from_row`].
pub const CONVERSATION_COLUMNS: &str = "id, client_hub, channel, status, created_at, updated_at, \
     last_activity_at, idle_timeout_minutes, closed_at, closed_by_message";

/// Column list matching [`message_from_row`], qualified with the `m` alias.
pub const MESSAGE_COLUMNS: &str = "m.id, m.conversation_id, m.message_type, m.body, m.timestamp, \
     m.owner, m.channel, m.meta, m.closes_conversation";

pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn conversion_err(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn ts_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn opt_ts_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_err(idx, e))
    })
    .transpose()
}

fn enum_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_err(idx, e))
}

pub fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        client_hub: row.get(1)?,
        channel: row.get(2)?,
        status: enum_at(row, 3)?,
        created_at: ts_at(row, 4)?,
        updated_at: ts_at(row, 5)?,
        last_activity_at: ts_at(row, 6)?,
        idle_timeout_minutes: row.get(7)?,
        closed_at: opt_ts_at(row, 8)?,
        closed_by_message: row.get(9)?,
    })
}

pub fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    let raw_meta: String = row.get(7)?;
    let meta: Meta = serde_json::from_str(&raw_meta).map_err(|e| conversion_err(7, e))?;
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        message_type: enum_at(row, 2)?,
        body: row.get(3)?,
        timestamp: ts_at(row, 4)?,
        owner: enum_at(row, 5)?,
        channel: row.get(6)?,
        meta,
        closes_conversation: row.get(8)?,
    })
}
