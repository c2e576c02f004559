// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot CLI commands: `send`, `history`, `stats`, `close`, `extend`,
//! `sweep`.

use colored::Colorize;
use parley_channel::{Outcome, OutcomeStatus, WebhookPayload};
use parley_core::{ConversationStats, Message, MessageOwner, ParleyError};
use parley_lifecycle::LifecycleEngine;

use crate::stack::Stack;

/// Kind of message sent by `parley send`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SendKind {
    Text,
    Audio,
    Image,
}

/// Pushes one message through the local adapter and prints the outcome.
///
/// For audio and image, `content` is the media id.
pub async fn run_send(
    stack: &Stack,
    user: &str,
    kind: SendKind,
    content: &str,
) -> Result<Outcome, ParleyError> {
    let now = stack.engine.clock().now();
    let payload = match kind {
        SendKind::Text => WebhookPayload::text(user, content, now),
        SendKind::Audio => WebhookPayload::audio(user, content, now),
        SendKind::Image => WebhookPayload::image(user, content, now),
    };
    let outcome = stack.local_adapter().process(&payload).await;
    print_outcome(&outcome);
    Ok(outcome)
}

pub fn print_outcome(outcome: &Outcome) {
    match outcome.status {
        OutcomeStatus::Processed => {
            println!(
                "{} {}",
                "agent>".green().bold(),
                outcome.response_text.as_deref().unwrap_or_default()
            );
            if let Some(id) = &outcome.conversation_id {
                println!("{}", format!("conversation {id}").dimmed());
            }
        }
        OutcomeStatus::Error => {
            eprintln!(
                "{}: {}",
                "error".red(),
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
        status => println!("{}", format!("message not processed: {status}").yellow()),
    }
}

pub async fn run_history(
    engine: &LifecycleEngine,
    client_hub: &str,
    limit: usize,
    include_closed: bool,
    json: bool,
) -> Result<(), ParleyError> {
    let messages = engine.history(client_hub, limit, include_closed).await?;
    if json {
        print_json(&messages)?;
        return Ok(());
    }
    if messages.is_empty() {
        println!("{}", format!("no messages for {client_hub}").dimmed());
        return Ok(());
    }
    for message in &messages {
        println!("{}", format_message(message));
    }
    Ok(())
}

pub fn format_message(message: &Message) -> String {
    let speaker = match message.owner {
        MessageOwner::User => "user".cyan(),
        MessageOwner::Agent => "agent".green(),
        MessageOwner::Team => "team".magenta(),
    };
    let mut line = format!(
        "{} {} [{}] {}",
        message.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
        speaker,
        message.message_type,
        message.body
    );
    if message.closes_conversation {
        line.push_str(&format!(" {}", "(closed)".yellow()));
    }
    line
}

pub async fn run_stats(
    engine: &LifecycleEngine,
    client_hub: Option<&str>,
    json: bool,
) -> Result<(), ParleyError> {
    let stats = engine.stats(client_hub).await?;
    if json {
        return print_json(&stats);
    }
    let scope = client_hub.unwrap_or("all clients");
    println!("{}", format!("conversation stats ({scope})").bold());
    print_stats(&stats);
    Ok(())
}

pub fn print_stats(stats: &ConversationStats) {
    println!("  total conversations:  {}", stats.total_conversations);
    println!("  active:               {}", stats.active_conversations);
    println!("  closed by timeout:    {}", stats.closed_by_timeout);
    println!("  closed by agent:      {}", stats.closed_by_agent);
    println!("  closed by user:       {}", stats.closed_by_user);
    println!("  expired:              {}", stats.expired);
    println!("  total messages:       {}", stats.total_messages);
    println!(
        "  avg messages/conv:    {:.2}",
        stats.average_messages_per_conversation
    );
}

pub async fn run_close(
    engine: &LifecycleEngine,
    client_hub: &str,
    reason: Option<&str>,
) -> Result<(), ParleyError> {
    if engine.force_close(client_hub, reason).await? {
        println!("{}", format!("closed active conversation of {client_hub}").green());
    } else {
        println!("{}", format!("{client_hub} has no active conversation").yellow());
    }
    Ok(())
}

pub async fn run_extend(
    engine: &LifecycleEngine,
    client_hub: &str,
    minutes: i64,
) -> Result<(), ParleyError> {
    if engine.extend_timeout(client_hub, minutes).await? {
        println!(
            "{}",
            format!("extended conversation of {client_hub} by {minutes} minutes").green()
        );
    } else {
        println!("{}", format!("{client_hub} has no active conversation").yellow());
    }
    Ok(())
}

pub async fn run_sweep(
    engine: &LifecycleEngine,
    older_than_days: Option<i64>,
    batch_size: Option<usize>,
) -> Result<(), ParleyError> {
    let count = engine.sweep_stale(older_than_days, batch_size).await?;
    println!("marked {count} conversation(s) expired");
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), ParleyError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| ParleyError::Internal(format!("failed to render JSON: {e}")))?;
    println!("{rendered}");
    Ok(())
}
