// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for health, the local harness and the admin API.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parley_channel::{Outcome, OutcomeStatus, WebhookPayload};
use parley_core::{Conversation, HealthStatus, Message, ParleyError};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::server::GatewayState;

/// Default page size for `GET /v1/conversations/{client_hub}/messages`.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn into_response_with(status: StatusCode, error: impl Into<String>) -> Response {
        (
            status,
            Json(ErrorResponse {
                error: error.into(),
            }),
        )
            .into_response()
    }
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Response body for GET /readiness.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Kind of message posted to the local harness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalKind {
    #[default]
    Text,
    Audio,
    Image,
}

/// Request body for POST /v1/local/messages.
#[derive(Debug, Deserialize)]
pub struct LocalMessageRequest {
    /// Sender address, e.g. `user_42`.
    pub user: String,
    #[serde(default)]
    pub kind: LocalKind,
    #[serde(default)]
    pub message: Option<String>,
    /// Required for audio and image messages.
    #[serde(default)]
    pub media_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub include_closed: bool,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub client_hub: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub client_hub: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CloseRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CloseResponse {
    pub client_hub: String,
    pub closed: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExtendRequest {
    pub minutes: i64,
}

#[derive(Debug, Serialize)]
pub struct ExtendResponse {
    pub client_hub: String,
    pub extended: bool,
    pub minutes: i64,
}

/// HTTP status for an adapter outcome.
pub fn outcome_status(outcome: &Outcome) -> StatusCode {
    match outcome.status {
        OutcomeStatus::NoMessage | OutcomeStatus::Accepted | OutcomeStatus::Processed => {
            StatusCode::OK
        }
        OutcomeStatus::Expired => StatusCode::UNPROCESSABLE_ENTITY,
        OutcomeStatus::UserNotFound => StatusCode::NOT_FOUND,
        OutcomeStatus::NoContent => StatusCode::BAD_REQUEST,
        OutcomeStatus::Error => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn outcome_response(outcome: Outcome) -> Response {
    (outcome_status(&outcome), Json(outcome)).into_response()
}

/// Maps an engine error onto a JSON error response.
pub fn error_response(err: ParleyError) -> Response {
    let status = match &err {
        ParleyError::ConversationNotFound { .. } => StatusCode::NOT_FOUND,
        ParleyError::ConversationNotActive { .. } | ParleyError::ActiveConversationExists { .. } => {
            StatusCode::CONFLICT
        }
        ParleyError::MessageValidation(_) | ParleyError::InvalidArgument(_) => {
            StatusCode::BAD_REQUEST
        }
        _ => {
            error!(error = %err, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    ErrorResponse::into_response_with(status, err.to_string())
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /readiness
///
/// Ready when the conversation store reports healthy or degraded.
pub async fn get_readiness(State(state): State<GatewayState>) -> Response {
    let (code, status, detail) = match state.engine.store().health_check().await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "ready", None),
        Ok(HealthStatus::Degraded(reason)) => (StatusCode::OK, "degraded", Some(reason)),
        Ok(HealthStatus::Unhealthy(reason)) => {
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable", Some(reason))
        }
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", Some(e.to_string())),
    };
    (
        code,
        Json(ReadinessResponse {
            status: status.to_string(),
            detail,
        }),
    )
        .into_response()
}

/// POST /v1/local/messages
///
/// Runs a message through the local adapter and waits for the reply.
pub async fn post_local_message(
    State(state): State<GatewayState>,
    Json(body): Json<LocalMessageRequest>,
) -> Response {
    let now = state.engine.clock().now();
    let payload = match (body.kind, body.media_id) {
        (LocalKind::Text, _) => {
            WebhookPayload::text(body.user, body.message.unwrap_or_default(), now)
        }
        (LocalKind::Audio, Some(media_id)) => WebhookPayload::audio(body.user, media_id, now),
        (LocalKind::Image, Some(media_id)) => WebhookPayload::image(body.user, media_id, now),
        (_, None) => {
            return ErrorResponse::into_response_with(
                StatusCode::BAD_REQUEST,
                "media_id is required for audio and image messages",
            );
        }
    };
    outcome_response(state.local.process(&payload).await)
}

/// GET /v1/conversations/{client_hub}
pub async fn get_active_conversation(
    State(state): State<GatewayState>,
    Path(client_hub): Path<String>,
) -> Response {
    match state.engine.active_conversation(&client_hub).await {
        Ok(Some(conversation)) => Json::<Conversation>(conversation).into_response(),
        Ok(None) => ErrorResponse::into_response_with(
            StatusCode::NOT_FOUND,
            format!("no active conversation for {client_hub}"),
        ),
        Err(e) => error_response(e),
    }
}

/// GET /v1/conversations/{client_hub}/messages?limit=&include_closed=
pub async fn get_messages(
    State(state): State<GatewayState>,
    Path(client_hub): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    match state
        .engine
        .history(&client_hub, limit, query.include_closed)
        .await
    {
        Ok(messages) => Json(MessagesResponse {
            client_hub,
            messages,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /v1/stats?client_hub=
pub async fn get_stats(
    State(state): State<GatewayState>,
    Query(query): Query<StatsQuery>,
) -> Response {
    match state.engine.stats(query.client_hub.as_deref()).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /v1/conversations/{client_hub}/close
pub async fn post_close(
    State(state): State<GatewayState>,
    Path(client_hub): Path<String>,
    Json(body): Json<CloseRequest>,
) -> Response {
    match state
        .engine
        .force_close(&client_hub, body.reason.as_deref())
        .await
    {
        Ok(closed) => Json(CloseResponse { client_hub, closed }).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /v1/conversations/{client_hub}/extend
pub async fn post_extend(
    State(state): State<GatewayState>,
    Path(client_hub): Path<String>,
    Json(body): Json<ExtendRequest>,
) -> Response {
    match state.engine.extend_timeout(&client_hub, body.minutes).await {
        Ok(extended) => Json(ExtendResponse {
            client_hub,
            extended,
            minutes: body.minutes,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}
