// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider webhook endpoints.
//!
//! `GET /webhook` answers the subscription handshake. `POST /webhook` stores
//! the inbound message before acknowledging and produces the reply on a
//! spawned task.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use parley_channel::{Admission, SIGNATURE_HEADER, WebhookPayload, verify_signature};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::handlers::{ErrorResponse, outcome_response};
use crate::server::GatewayState;

/// Query parameters of the subscription handshake.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// GET /webhook
///
/// Echoes `hub.challenge` when the mode is `subscribe` and the token matches.
pub async fn verify_webhook(
    State(state): State<GatewayState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let token_matches = matches!(
        (&state.verify_token, &params.verify_token),
        (Some(expected), Some(given)) if expected == given
    );
    match (params.mode.as_deref(), params.challenge) {
        (Some("subscribe"), Some(challenge)) if token_matches => {
            debug!("webhook verified");
            (StatusCode::OK, challenge).into_response()
        }
        _ => {
            warn!("webhook verification failed");
            ErrorResponse::into_response_with(StatusCode::FORBIDDEN, "webhook verification failed")
        }
    }
}

/// POST /webhook
pub async fn receive_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = state.app_secret.as_deref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !verify_signature(secret, signature, &body) {
            warn!("rejecting webhook with invalid signature");
            return ErrorResponse::into_response_with(
                StatusCode::UNAUTHORIZED,
                "invalid webhook signature",
            );
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "malformed webhook payload");
            return ErrorResponse::into_response_with(
                StatusCode::BAD_REQUEST,
                format!("malformed webhook payload: {e}"),
            );
        }
    };

    match state.webhook.accept(&payload).await {
        Admission::Rejected(outcome) => outcome_response(outcome),
        Admission::Accepted(pending) => {
            let ack = pending.ack();
            let adapter = state.webhook.clone();
            tokio::spawn(async move {
                let outcome = adapter.complete(pending).await;
                debug!(status = %outcome.status, "webhook reply finished");
            });
            (StatusCode::OK, Json(ack)).into_response()
        }
    }
}
