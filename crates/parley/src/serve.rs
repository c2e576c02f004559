// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley serve` command implementation.
//!
//! Opens the store, starts the HTTP gateway and runs the periodic sweep
//! until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parley_config::model::ParleyConfig;
use parley_core::ParleyError;
use parley_gateway::{GatewayState, ServerConfig};
use parley_lifecycle::LifecycleEngine;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::shutdown;
use crate::stack::Stack;

pub async fn run_serve(config: ParleyConfig) -> Result<(), ParleyError> {
    info!(service = %config.service.name, "starting parley serve");

    let stack = Stack::open(config).await?;
    let state = GatewayState {
        webhook: Arc::new(stack.webhook_adapter()?),
        local: Arc::new(stack.local_adapter()),
        engine: stack.engine.clone(),
        verify_token: stack.config.whatsapp.verify_token.clone(),
        app_secret: stack.config.whatsapp.app_secret.clone(),
        start_time: Instant::now(),
    };
    if state.verify_token.is_none() {
        warn!("whatsapp.verify_token not set, webhook verification will be refused");
    }

    let cancel = shutdown::install_signal_handler();

    let interval_minutes = stack.config.conversation.cleanup_interval_minutes;
    if interval_minutes > 0 {
        let engine = stack.engine.clone();
        let sweep_cancel = cancel.clone();
        tokio::spawn(async move {
            sweep_loop(engine, Duration::from_secs(interval_minutes * 60), sweep_cancel).await;
        });
        info!(interval_minutes, "periodic sweep enabled");
    } else {
        info!("periodic sweep disabled");
    }

    let server_config = ServerConfig {
        host: stack.config.gateway.host.clone(),
        port: stack.config.gateway.port,
    };
    let served = parley_gateway::start_server(&server_config, state, cancel.clone()).await;
    cancel.cancel();

    stack.close().await?;
    served?;
    info!("parley serve shutdown complete");
    Ok(())
}

/// Marks stale closed conversations EXPIRED every `period` until cancelled.
async fn sweep_loop(engine: Arc<LifecycleEngine>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    // Skip the first immediate tick.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match engine.sweep_stale(None, None).await {
                    Ok(0) => debug!("sweep found nothing to expire"),
                    Ok(count) => info!(count, "periodic sweep expired conversations"),
                    Err(e) => warn!(error = %e, "periodic sweep failed (non-fatal)"),
                }
            }
            _ = cancel.cancelled() => {
                debug!("sweep task shutting down");
                break;
            }
        }
    }
}

pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parley={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
