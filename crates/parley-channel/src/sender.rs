// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound reply delivery.
//!
//! [`WhatsAppCloudSender`] posts text messages to the WhatsApp Cloud API;
//! [`LogSender`] only logs them, for local runs without credentials.

use std::time::Duration;

use async_trait::async_trait;
use parley_config::model::WhatsAppConfig;
use parley_core::{AdapterType, HealthStatus, OutboundReply, ParleyError, PluginAdapter, ReplySender};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Sender that writes replies to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSender;

#[async_trait]
impl PluginAdapter for LogSender {
    fn name(&self) -> &str {
        "log-sender"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Sender
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl ReplySender for LogSender {
    async fn send(&self, reply: &OutboundReply) -> Result<(), ParleyError> {
        info!(
            recipient = %reply.recipient,
            channel = %reply.channel,
            conversation_id = %reply.conversation_id,
            body = %reply.body,
            "reply"
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct TextMessageRequest<'a> {
    messaging_product: &'static str,
    recipient_type: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    type_: &'static str,
    text: TextContent<'a>,
}

#[derive(Debug, Serialize)]
struct TextContent<'a> {
    body: &'a str,
}

/// Delivers replies through the WhatsApp Cloud API.
///
/// Transient failures (429, 500, 503) are retried once.
#[derive(Debug, Clone)]
pub struct WhatsAppCloudSender {
    client: reqwest::Client,
    messages_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl WhatsAppCloudSender {
    /// Builds a sender from the `[whatsapp]` section. Requires `api_token`
    /// and `phone_number_id`.
    pub fn new(config: &WhatsAppConfig) -> Result<Self, ParleyError> {
        let token = config
            .api_token
            .as_deref()
            .ok_or_else(|| ParleyError::Config("whatsapp.api_token is not set".into()))?;
        let phone_number_id = config
            .phone_number_id
            .as_deref()
            .ok_or_else(|| ParleyError::Config("whatsapp.phone_number_id is not set".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                ParleyError::Config(format!("invalid API token header value: {e}"))
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ParleyError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            messages_url: format!(
                "{}/{phone_number_id}/messages",
                config.api_base_url.trim_end_matches('/')
            ),
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Overrides the pause before a retry.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }
}

#[async_trait]
impl PluginAdapter for WhatsAppCloudSender {
    fn name(&self) -> &str {
        "whatsapp-cloud"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Sender
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl ReplySender for WhatsAppCloudSender {
    async fn send(&self, reply: &OutboundReply) -> Result<(), ParleyError> {
        let request = TextMessageRequest {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to: &reply.recipient,
            type_: "text",
            text: TextContent { body: &reply.body },
        };

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying reply delivery after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = self
                .client
                .post(&self.messages_url)
                .json(&request)
                .send()
                .await
                .map_err(|e| ParleyError::Channel {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "reply delivery response received");

            if status.is_success() {
                debug!(
                    recipient = %reply.recipient,
                    conversation_id = %reply.conversation_id,
                    "reply delivered"
                );
                return Ok(());
            }

            let body = response.text().await.unwrap_or_default();
            let error = ParleyError::channel(format!("API returned {status}: {body}"));
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(error);
                continue;
            }
            return Err(error);
        }

        Err(last_error.unwrap_or_else(|| ParleyError::channel("reply delivery failed after retries")))
    }
}

fn is_transient_error(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::SERVICE_UNAVAILABLE
    )
}
