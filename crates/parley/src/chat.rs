// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley chat` command implementation.
//!
//! Interactive REPL that plays the user side of a conversation through the
//! local adapter, with readline history.

use colored::Colorize;
use parley_channel::{UserDirectory, WebhookPayload};
use parley_core::ParleyError;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::admin::{format_message, print_outcome, print_stats};
use crate::stack::Stack;

/// History lines shown by the `history` command.
const CHAT_HISTORY_LIMIT: usize = 10;

/// REPL command parsed from one input line.
#[derive(Debug, PartialEq, Eq)]
enum ChatCommand<'a> {
    Quit,
    Help,
    Stats,
    History,
    Close,
    Send(&'a str),
    Empty,
}

fn parse_line(line: &str) -> ChatCommand<'_> {
    let trimmed = line.trim();
    match trimmed {
        "" => ChatCommand::Empty,
        "quit" | "exit" | "/quit" | "/exit" => ChatCommand::Quit,
        "help" | "/help" => ChatCommand::Help,
        "stats" | "/stats" => ChatCommand::Stats,
        "history" | "/history" => ChatCommand::History,
        "/close" => ChatCommand::Close,
        text => ChatCommand::Send(text),
    }
}

fn print_help() {
    println!("  {}      conversation stats for this user", "stats".yellow());
    println!("  {}    last {CHAT_HISTORY_LIMIT} messages", "history".yellow());
    println!("  {}     close the active conversation", "/close".yellow());
    println!("  {}       leave the chat", "quit".yellow());
    println!("  anything else is sent as a message");
}

pub async fn run_chat(stack: &Stack, user: &str) -> Result<(), ParleyError> {
    let adapter = stack.local_adapter();
    let profile = parley_channel::LocalUserDirectory
        .lookup(user)
        .await?
        .ok_or_else(|| ParleyError::InvalidArgument(format!("unknown user {user}")))?;
    let client_hub = profile.client_hub();

    let mut rl = DefaultEditor::new()
        .map_err(|e| ParleyError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "parley chat".bold().green());
    println!(
        "Chatting as {} ({client_hub}). Type {} for commands.\n",
        user.cyan(),
        "help".yellow()
    );

    let prompt = format!("{}> ", user.cyan());
    loop {
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        };

        let command = parse_line(&line);
        if command != ChatCommand::Empty {
            let _ = rl.add_history_entry(line.as_str());
        }

        let result = match command {
            ChatCommand::Empty => Ok(()),
            ChatCommand::Quit => break,
            ChatCommand::Help => {
                print_help();
                Ok(())
            }
            ChatCommand::Stats => stack
                .engine
                .stats(Some(&client_hub))
                .await
                .map(|stats| print_stats(&stats)),
            ChatCommand::History => stack
                .engine
                .history(&client_hub, CHAT_HISTORY_LIMIT, false)
                .await
                .map(|messages| {
                    for message in &messages {
                        println!("{}", format_message(message));
                    }
                }),
            ChatCommand::Close => stack.engine.force_close(&client_hub, None).await.map(|closed| {
                if closed {
                    println!("{}", "conversation closed".yellow());
                } else {
                    println!("{}", "no active conversation".dimmed());
                }
            }),
            ChatCommand::Send(text) => {
                let payload = WebhookPayload::text(user, text, stack.engine.clock().now());
                print_outcome(&adapter.process(&payload).await);
                Ok(())
            }
        };
        if let Err(e) = result {
            eprintln!("{}: {e}", "error".red());
        }
    }

    println!("{}", "bye".dimmed());
    Ok(())
}
