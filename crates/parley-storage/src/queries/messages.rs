// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message rows: appending and per-client history.

use chrono::{DateTime, Utc};
use parley_core::{ConversationStatus, Message, MessageData, ParleyError};
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::models::{format_ts, message_from_row, MESSAGE_COLUMNS};

/// Insert a message into an ACTIVE conversation and refresh the
/// conversation's activity time, in one transaction.
///
/// `now` stamps the conversation; the message keeps its authored timestamp
/// (falling back to `now` when absent).
pub async fn insert_message(
    db: &Database,
    conversation_id: &str,
    data: MessageData,
    now: DateTime<Utc>,
) -> Result<Message, ParleyError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Result<Message, ParleyError>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let row: Option<(String, String)> = tx
                .query_row(
                    "SELECT status, channel FROM conversations WHERE id = ?1",
                    params![conversation_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let Some((status, conversation_channel)) = row else {
                return Ok(Err(ParleyError::ConversationNotFound { conversation_id }));
            };
            let status = match status.parse::<ConversationStatus>() {
                Ok(status) => status,
                Err(e) => return Ok(Err(ParleyError::storage(e))),
            };
            if status != ConversationStatus::Active {
                return Ok(Err(ParleyError::ConversationNotActive {
                    conversation_id,
                    status,
                }));
            }

            let meta = match serde_json::to_string(&data.meta) {
                Ok(meta) => meta,
                Err(e) => return Ok(Err(ParleyError::storage(e))),
            };
            let message = Message {
                id: uuid::Uuid::new_v4().to_string(),
                conversation_id,
                message_type: data.message_type,
                body: data.body,
                timestamp: data.timestamp.unwrap_or(now),
                owner: data.owner,
                channel: data.channel.unwrap_or(conversation_channel),
                meta: data.meta,
                closes_conversation: data.closes_conversation,
            };

            tx.execute(
                "INSERT INTO messages
                     (id, conversation_id, message_type, body, timestamp, owner, channel,
                      meta, closes_conversation)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    message.id,
                    message.conversation_id,
                    message.message_type.to_string(),
                    message.body,
                    format_ts(message.timestamp),
                    message.owner.to_string(),
                    message.channel,
                    meta,
                    message.closes_conversation,
                ],
            )?;
            tx.execute(
                "UPDATE conversations SET last_activity_at = ?1, updated_at = ?1 WHERE id = ?2",
                params![format_ts(now), message.conversation_id],
            )?;
            tx.commit()?;
            Ok(Ok(message))
        })
        .await
        .map_err(map_tr_err)?
}

/// The `limit` most recent messages of a client, returned oldest first.
///
/// Only the ACTIVE conversation's messages are considered unless
/// `include_closed` is set.
pub async fn history(
    db: &Database,
    client_hub: &str,
    limit: usize,
    include_closed: bool,
) -> Result<Vec<Message>, ParleyError> {
    let client_hub = client_hub.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages m
                 JOIN conversations c ON c.id = m.conversation_id
                 WHERE c.client_hub = ?1 AND (?2 OR c.status = 'active')
                 ORDER BY m.timestamp DESC, m.rowid DESC
                 LIMIT ?3"
            ))?;
            let rows = stmt.query_map(
                params![client_hub, include_closed, limit as i64],
                message_from_row,
            )?;
            let mut messages = rows.collect::<Result<Vec<_>, _>>()?;
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}
