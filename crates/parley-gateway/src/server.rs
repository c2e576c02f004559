// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    routing::{get, post},
};
use parley_channel::ChannelAdapter;
use parley_core::ParleyError;
use parley_lifecycle::LifecycleEngine;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::webhook;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Adapter for the provider webhook.
    pub webhook: Arc<ChannelAdapter>,
    /// Adapter for `POST /v1/local/messages`.
    pub local: Arc<ChannelAdapter>,
    pub engine: Arc<LifecycleEngine>,
    /// Expected `hub.verify_token`. `None` rejects every verification.
    pub verify_token: Option<String>,
    /// Secret for `X-Hub-Signature-256`. `None` skips the check.
    pub app_secret: Option<String>,
    pub start_time: Instant,
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("webhook", &self.webhook.channel())
            .field("local", &self.local.channel())
            .field("verify_token", &self.verify_token.as_ref().map(|_| "[redacted]"))
            .field("app_secret", &self.app_secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Address the gateway binds to.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Builds the gateway router:
/// - `GET /health`, `GET /readiness`
/// - `GET|POST /webhook`
/// - `POST /v1/local/messages`
/// - `GET /v1/stats`
/// - `GET /v1/conversations/{client_hub}` and its `messages`, `close` and
///   `extend` sub-routes
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/readiness", get(handlers::get_readiness))
        .route(
            "/webhook",
            get(webhook::verify_webhook).post(webhook::receive_webhook),
        )
        .route("/v1/local/messages", post(handlers::post_local_message))
        .route("/v1/stats", get(handlers::get_stats))
        .route(
            "/v1/conversations/{client_hub}",
            get(handlers::get_active_conversation),
        )
        .route(
            "/v1/conversations/{client_hub}/messages",
            get(handlers::get_messages),
        )
        .route(
            "/v1/conversations/{client_hub}/close",
            post(handlers::post_close),
        )
        .route(
            "/v1/conversations/{client_hub}/extend",
            post(handlers::post_extend),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds to `host:port` and serves until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), ParleyError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ParleyError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| ParleyError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway stopped");
    Ok(())
}
