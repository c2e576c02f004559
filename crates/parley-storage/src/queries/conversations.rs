// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation rows: creation, lookup, closing, timeout extension, stats and
//! the expiry sweep.

use chrono::{DateTime, Utc};
use parley_config::model::MAX_IDLE_TIMEOUT_MINUTES;
use parley_core::{Conversation, ConversationStats, ConversationStatus, ParleyError};
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::models::{conversation_from_row, format_ts, CONVERSATION_COLUMNS};

/// Get a conversation by id.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, ParleyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
                params![id],
                conversation_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// The ACTIVE conversation of a client, if any.
pub async fn find_active(
    db: &Database,
    client_hub: &str,
) -> Result<Option<Conversation>, ParleyError> {
    let client_hub = client_hub.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations
                     WHERE client_hub = ?1 AND status = 'active'"
                ),
                params![client_hub],
                conversation_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a new ACTIVE conversation.
///
/// The partial unique index on `client_hub` rejects a second active row;
/// that rejection is reported as [`ParleyError::ActiveConversationExists`].
pub async fn insert_conversation(
    db: &Database,
    client_hub: &str,
    channel: &str,
    idle_timeout_minutes: i64,
    now: DateTime<Utc>,
) -> Result<Conversation, ParleyError> {
    let conversation = Conversation {
        id: uuid::Uuid::new_v4().to_string(),
        client_hub: client_hub.to_string(),
        channel: channel.to_string(),
        status: ConversationStatus::Active,
        created_at: now,
        updated_at: now,
        last_activity_at: now,
        idle_timeout_minutes,
        closed_at: None,
        closed_by_message: None,
    };
    let row = conversation.clone();
    db.connection()
        .call(move |conn| -> Result<Result<(), ParleyError>, rusqlite::Error> {
            let ts = format_ts(row.created_at);
            let inserted = conn.execute(
                "INSERT INTO conversations
                     (id, client_hub, channel, status, created_at, updated_at,
                      last_activity_at, idle_timeout_minutes)
                 VALUES (?1, ?2, ?3, 'active', ?4, ?4, ?4, ?5)",
                params![row.id, row.client_hub, row.channel, ts, row.idle_timeout_minutes],
            );
            match inserted {
                Ok(_) => Ok(Ok(())),
                Err(e) if is_unique_violation(&e) => {
                    Ok(Err(ParleyError::ActiveConversationExists {
                        client_hub: row.client_hub,
                    }))
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)??;
    Ok(conversation)
}

/// Only the one-active-per-client index raises a UNIQUE violation on insert;
/// other constraint failures stay storage errors.
fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Move an ACTIVE conversation into `new_status`, stamping `closed_at`.
pub async fn close_conversation(
    db: &Database,
    id: &str,
    new_status: ConversationStatus,
    closing_message: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), ParleyError> {
    let id = id.to_string();
    let closing_message = closing_message.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<Result<(), ParleyError>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let status: Option<String> = tx
                .query_row(
                    "SELECT status FROM conversations WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            let status = match status.map(|s| s.parse::<ConversationStatus>()) {
                None => {
                    return Ok(Err(ParleyError::ConversationNotFound {
                        conversation_id: id,
                    }));
                }
                Some(Err(e)) => return Ok(Err(ParleyError::storage(e))),
                Some(Ok(status)) => status,
            };
            if status != ConversationStatus::Active {
                return Ok(Err(ParleyError::ConversationNotActive {
                    conversation_id: id,
                    status,
                }));
            }
            let ts = format_ts(now);
            tx.execute(
                "UPDATE conversations
                 SET status = ?1, closed_at = ?2, closed_by_message = ?3, updated_at = ?2
                 WHERE id = ?4 AND status = 'active'",
                params![new_status.to_string(), ts, closing_message, id],
            )?;
            tx.commit()?;
            Ok(Ok(()))
        })
        .await
        .map_err(map_tr_err)?
}

/// Add `minutes` to the client's ACTIVE conversation and refresh its
/// activity time. Returns false when the client has no active conversation
/// or the sum would exceed [`MAX_IDLE_TIMEOUT_MINUTES`].
pub async fn extend_timeout(
    db: &Database,
    client_hub: &str,
    minutes: i64,
    now: DateTime<Utc>,
) -> Result<bool, ParleyError> {
    let client_hub = client_hub.to_string();
    db.connection()
        .call(move |conn| {
            let ts = format_ts(now);
            let changed = conn.execute(
                "UPDATE conversations
                 SET idle_timeout_minutes = idle_timeout_minutes + ?1,
                     last_activity_at = ?2, updated_at = ?2
                 WHERE client_hub = ?3 AND status = 'active'
                   AND idle_timeout_minutes <= ?4 - ?1",
                params![minutes, ts, client_hub, MAX_IDLE_TIMEOUT_MINUTES],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// All conversations of a client, newest first.
pub async fn list_conversations(
    db: &Database,
    client_hub: &str,
) -> Result<Vec<Conversation>, ParleyError> {
    let client_hub = client_hub.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 WHERE client_hub = ?1 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt.query_map(params![client_hub], conversation_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Per-status conversation counts and the message total, optionally
/// scoped to one client.
pub async fn stats(
    db: &Database,
    client_hub: Option<&str>,
) -> Result<ConversationStats, ParleyError> {
    let client_hub = client_hub.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<Result<ConversationStats, ParleyError>, rusqlite::Error> {
            let mut stats = ConversationStats::default();
            let mut stmt = conn.prepare(
                "SELECT status, COUNT(*) FROM conversations
                 WHERE ?1 IS NULL OR client_hub = ?1
                 GROUP BY status",
            )?;
            let rows = stmt.query_map(params![client_hub], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (status, count) = row?;
                let count = count as u64;
                stats.total_conversations += count;
                match status.parse::<ConversationStatus>() {
                    Ok(ConversationStatus::Active) => stats.active_conversations = count,
                    Ok(ConversationStatus::IdleTimeout) => stats.closed_by_timeout = count,
                    Ok(ConversationStatus::AgentClosed) => stats.closed_by_agent = count,
                    Ok(ConversationStatus::UserClosed) => stats.closed_by_user = count,
                    Ok(ConversationStatus::Expired) => stats.expired = count,
                    Err(e) => return Ok(Err(ParleyError::storage(e))),
                }
            }

            let total_messages: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages m
                 JOIN conversations c ON c.id = m.conversation_id
                 WHERE ?1 IS NULL OR c.client_hub = ?1",
                params![client_hub],
                |row| row.get(0),
            )?;
            stats.total_messages = total_messages as u64;
            stats.average_messages_per_conversation =
                ConversationStats::average(stats.total_messages, stats.total_conversations);
            Ok(Ok(stats))
        })
        .await
        .map_err(map_tr_err)?
}

/// Ids of closed, not yet expired conversations last updated before `cutoff`,
/// oldest first, at most `limit`.
pub async fn stale_candidates(
    db: &Database,
    cutoff: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<String>, ParleyError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM conversations
                 WHERE status NOT IN ('active', 'expired') AND updated_at < ?1
                 ORDER BY updated_at ASC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![format_ts(cutoff), limit as i64], |row| {
                row.get::<_, String>(0)
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Mark one closed conversation as EXPIRED. Returns false if it was not in a
/// closed state any more.
pub async fn mark_expired(db: &Database, id: &str, now: DateTime<Utc>) -> Result<bool, ParleyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE conversations SET status = 'expired', updated_at = ?1
                 WHERE id = ?2 AND status NOT IN ('active', 'expired')",
                params![format_ts(now), id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}
