// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parley - conversation lifecycle service for message channels.
//!
//! This is the binary entry point: the webhook server plus a set of local
//! commands for driving and inspecting conversations.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod admin;
mod chat;
mod serve;
mod shutdown;
mod stack;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use parley_channel::OutcomeStatus;
use parley_config::model::ParleyConfig;
use parley_core::ParleyError;

use crate::admin::SendKind;
use crate::stack::Stack;

/// Parley - conversation lifecycle service for message channels.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about, long_about = None)]
struct Cli {
    /// Configuration file to load instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook gateway.
    Serve,
    /// Send one message as a local user and print the reply.
    Send {
        /// Sender identifier, e.g. `user_7`.
        #[arg(long, default_value = "user_1")]
        user: String,
        /// Message kind.
        #[arg(long, value_enum, default_value_t = SendKind::Text)]
        kind: SendKind,
        /// Message text, or the media id for audio and image.
        content: String,
    },
    /// Chat interactively as a local user.
    Chat {
        /// Sender identifier, e.g. `user_7`.
        #[arg(long, default_value = "user_1")]
        user: String,
    },
    /// Show the message history of a client.
    History {
        client_hub: String,
        #[arg(long, default_value_t = 50)]
        limit: usize,
        /// Include messages from closed conversations.
        #[arg(long)]
        include_closed: bool,
        /// Print JSON instead of formatted lines.
        #[arg(long)]
        json: bool,
    },
    /// Show conversation statistics.
    Stats {
        /// Restrict to one client.
        #[arg(long)]
        client_hub: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Close a client's active conversation.
    Close {
        client_hub: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Push a client's active conversation deadline forward.
    Extend {
        client_hub: String,
        #[arg(long, default_value_t = 30)]
        minutes: i64,
    },
    /// Mark long-closed conversations as expired.
    Sweep {
        /// Age threshold in days (defaults to `conversation.cleanup_days_old`).
        #[arg(long)]
        days: Option<i64>,
        /// Maximum conversations per run (defaults to `conversation.cleanup_batch_size`).
        #[arg(long)]
        batch: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => parley_config::load_and_validate_path(path),
        None => parley_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            parley_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    serve::init_tracing(&config.service.log_level);

    let Some(command) = cli.command else {
        println!("parley: use --help for available commands");
        return;
    };

    match dispatch(command, config).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            std::process::exit(1);
        }
    }
}

/// Runs one subcommand. `Ok(false)` means the command ran but failed its
/// task, e.g. a message that produced an error outcome.
async fn dispatch(command: Commands, config: ParleyConfig) -> Result<bool, ParleyError> {
    if let Commands::Serve = command {
        serve::run_serve(config).await?;
        return Ok(true);
    }

    let stack = Stack::open(config).await?;
    let result = run_local(command, &stack).await;
    stack.close().await?;
    result
}

async fn run_local(command: Commands, stack: &Stack) -> Result<bool, ParleyError> {
    let engine = &stack.engine;
    match command {
        Commands::Serve => {
            return Err(ParleyError::InvalidArgument(
                "serve is not a local command".to_string(),
            ));
        }
        Commands::Send {
            user,
            kind,
            content,
        } => {
            let outcome = admin::run_send(stack, &user, kind, &content).await?;
            return Ok(outcome.status != OutcomeStatus::Error);
        }
        Commands::Chat { user } => chat::run_chat(stack, &user).await?,
        Commands::History {
            client_hub,
            limit,
            include_closed,
            json,
        } => admin::run_history(engine, &client_hub, limit, include_closed, json).await?,
        Commands::Stats { client_hub, json } => {
            admin::run_stats(engine, client_hub.as_deref(), json).await?
        }
        Commands::Close { client_hub, reason } => {
            admin::run_close(engine, &client_hub, reason.as_deref()).await?
        }
        Commands::Extend {
            client_hub,
            minutes,
        } => admin::run_extend(engine, &client_hub, minutes).await?,
        Commands::Sweep { days, batch } => admin::run_sweep(engine, days, batch).await?,
    }
    Ok(true)
}
