// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns inbound channel events into conversation activity.
//!
//! Handling is split in two phases so a webhook can be acknowledged quickly:
//! [`ChannelAdapter::accept`] admits the event and durably stores the inbound
//! message, [`ChannelAdapter::complete`] produces, stores and sends the
//! reply. [`ChannelAdapter::process`] runs both back to back.

use std::sync::Arc;
use std::time::Instant;

use chrono::TimeDelta;
use parley_config::model::ChannelConfig;
use parley_core::{MessageData, MessageOwner, MessageType, OutboundReply, ParleyError, ReplySender};
use parley_lifecycle::LifecycleEngine;
use tracing::{debug, error, info, warn};

use crate::directory::{LocalUserDirectory, UserDirectory, UserProfile};
use crate::media::{MediaInterpreter, PlaceholderMedia};
use crate::outcome::Outcome;
use crate::payload::{InboundRecord, RecordContent, WebhookPayload};
use crate::reply::{CannedReplyGenerator, ReplyGenerator};
use crate::sender::LogSender;

/// Messages handed to the reply generator as context.
pub const REPLY_CONTEXT_LIMIT: usize = 10;

/// Result of phase one.
#[derive(Debug)]
pub enum Admission {
    /// The event was turned away; nothing was written.
    Rejected(Outcome),
    /// The inbound message is stored and a reply is owed.
    Accepted(PendingReply),
}

/// An accepted inbound message waiting for its reply.
#[derive(Debug, Clone)]
pub struct PendingReply {
    user: UserProfile,
    recipient: String,
    conversation_id: String,
    inbound_message_id: String,
    inbound_body: String,
    started: Instant,
}

impl PendingReply {
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    /// The acknowledgement to return before the reply exists.
    pub fn ack(&self) -> Outcome {
        Outcome::accepted(&self.conversation_id)
    }
}

/// Channel adapter for one channel tag (`"whatsapp"`, `"local"`, ...).
pub struct ChannelAdapter {
    engine: Arc<LifecycleEngine>,
    channel: String,
    config: ChannelConfig,
    directory: Arc<dyn UserDirectory>,
    media: Arc<dyn MediaInterpreter>,
    replies: Arc<dyn ReplyGenerator>,
    sender: Arc<dyn ReplySender>,
}

impl ChannelAdapter {
    /// An adapter with the local directory, placeholder media, canned
    /// replies and a logging sender. Swap parts with the `with_*` methods.
    pub fn new(
        engine: Arc<LifecycleEngine>,
        channel: impl Into<String>,
        config: ChannelConfig,
    ) -> Self {
        Self {
            engine,
            channel: channel.into(),
            config,
            directory: Arc::new(LocalUserDirectory),
            media: Arc::new(PlaceholderMedia),
            replies: Arc::new(CannedReplyGenerator),
            sender: Arc::new(LogSender),
        }
    }

    pub fn with_directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = directory;
        self
    }

    pub fn with_media(mut self, media: Arc<dyn MediaInterpreter>) -> Self {
        self.media = media;
        self
    }

    pub fn with_replies(mut self, replies: Arc<dyn ReplyGenerator>) -> Self {
        self.replies = replies;
        self
    }

    pub fn with_sender(mut self, sender: Arc<dyn ReplySender>) -> Self {
        self.sender = sender;
        self
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn engine(&self) -> &Arc<LifecycleEngine> {
        &self.engine
    }

    pub fn sender(&self) -> &Arc<dyn ReplySender> {
        &self.sender
    }

    /// Handles an event end to end and reports what happened.
    pub async fn process(&self, payload: &WebhookPayload) -> Outcome {
        match self.accept(payload).await {
            Admission::Rejected(outcome) => outcome,
            Admission::Accepted(pending) => self.complete(pending).await,
        }
    }

    /// Phase one: admission checks, then the inbound message is appended to
    /// the sender's live conversation.
    ///
    /// Checks run in order: a message is present, it is not older than
    /// `message_max_age_secs`, the sender is a known user, it has content.
    pub async fn accept(&self, payload: &WebhookPayload) -> Admission {
        let started = Instant::now();

        let Some(record) = payload.first_message() else {
            debug!(channel = %self.channel, "event carries no message");
            return Admission::Rejected(Outcome::no_message());
        };

        if self.is_stale(record) {
            warn!(
                channel = %self.channel,
                message_id = %record.id,
                max_age_secs = self.config.message_max_age_secs,
                "discarding stale message"
            );
            return Admission::Rejected(Outcome::expired(self.config.message_max_age_secs));
        }

        let user = match self.directory.lookup(&record.from).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(channel = %self.channel, sender = %record.from, "message from unknown sender");
                return Admission::Rejected(Outcome::user_not_found(&record.from));
            }
            Err(e) => {
                error!(channel = %self.channel, error = %e, "user lookup failed");
                return Admission::Rejected(Outcome::error(e));
            }
        };

        let (body, message_type) = match self.extract_body(record).await {
            Ok(Some(extracted)) => extracted,
            Ok(None) => {
                let kind = content_kind(&record.content);
                warn!(
                    channel = %self.channel,
                    message_id = %record.id,
                    kind,
                    "message has no usable content"
                );
                return Admission::Rejected(Outcome::no_content(kind));
            }
            Err(e) => {
                error!(
                    channel = %self.channel,
                    message_id = %record.id,
                    error = %e,
                    "media interpretation failed"
                );
                return Admission::Rejected(Outcome::error(e));
            }
        };

        match self.store_inbound(&user, record, &body, message_type).await {
            Ok((conversation_id, inbound_message_id)) => {
                info!(
                    channel = %self.channel,
                    client_hub = %user.client_hub(),
                    conversation_id = %conversation_id,
                    message_type = %message_type,
                    "inbound message accepted"
                );
                Admission::Accepted(PendingReply {
                    user,
                    recipient: record.from.clone(),
                    conversation_id,
                    inbound_message_id,
                    inbound_body: body,
                    started,
                })
            }
            Err(e) => {
                error!(
                    channel = %self.channel,
                    client_hub = %user.client_hub(),
                    error = %e,
                    "failed to store inbound message"
                );
                Admission::Rejected(Outcome::error(e))
            }
        }
    }

    /// Phase two: generates the reply, appends it to the conversation that
    /// stored the inbound message and hands it to the sender.
    ///
    /// If that conversation closed in the meantime the reply is dropped and
    /// the outcome is an error; no conversation is reopened for it. Delivery
    /// failures are logged and do not undo the stored reply.
    pub async fn complete(&self, pending: PendingReply) -> Outcome {
        match self.try_complete(&pending).await {
            Ok(text) => {
                let elapsed =
                    u64::try_from(pending.started.elapsed().as_millis()).unwrap_or(u64::MAX);
                Outcome::processed(pending.conversation_id.clone(), text, elapsed)
            }
            Err(e) => {
                error!(
                    channel = %self.channel,
                    conversation_id = %pending.conversation_id,
                    error = %e,
                    "failed to produce reply"
                );
                Outcome {
                    conversation_id: Some(pending.conversation_id.clone()),
                    ..Outcome::error(e)
                }
            }
        }
    }

    async fn try_complete(&self, pending: &PendingReply) -> Result<String, ParleyError> {
        let client_hub = pending.user.client_hub();
        let context = self
            .engine
            .history(&client_hub, REPLY_CONTEXT_LIMIT, false)
            .await?;
        let text = self
            .replies
            .generate(&pending.user, &pending.inbound_body, &context)
            .await?;

        let data = MessageData::text(text.clone(), MessageOwner::Agent)
            .with_channel(self.channel.clone())
            .with_meta("agent_type", self.config.agent_type.clone())
            .with_meta("response_to", pending.inbound_message_id.clone());
        let appended = match self.engine.append(&pending.conversation_id, data).await {
            Ok(appended) => appended,
            Err(e @ ParleyError::ConversationNotActive { .. }) => {
                warn!(
                    conversation_id = %pending.conversation_id,
                    client_hub = %client_hub,
                    "conversation closed before its reply was ready, reply dropped"
                );
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let reply = OutboundReply {
            recipient: pending.recipient.clone(),
            channel: self.channel.clone(),
            conversation_id: pending.conversation_id.clone(),
            body: text.clone(),
        };
        if let Err(e) = self.sender.send(&reply).await {
            warn!(
                conversation_id = %reply.conversation_id,
                sender = self.sender.name(),
                error = %e,
                "reply stored but delivery failed"
            );
        }

        if appended.conversation_closed {
            info!(conversation_id = %pending.conversation_id, "reply closed the conversation");
        }
        Ok(text)
    }

    /// Recent history of `user` rendered as `User: ...` / `Agent: ...` lines.
    pub async fn conversation_context(
        &self,
        user: &UserProfile,
        limit: usize,
    ) -> Result<String, ParleyError> {
        let messages = self.engine.history(&user.client_hub(), limit, false).await?;
        let lines: Vec<String> = messages
            .iter()
            .map(|m| {
                let speaker = match m.owner {
                    MessageOwner::User => "User",
                    MessageOwner::Agent => "Agent",
                    MessageOwner::Team => "Team",
                };
                format!("{speaker}: {}", m.body)
            })
            .collect();
        Ok(lines.join("\n"))
    }

    /// Unparseable timestamps count as stale.
    fn is_stale(&self, record: &InboundRecord) -> bool {
        let Some(authored) = record.timestamp.to_datetime() else {
            return true;
        };
        let max_age = i64::try_from(self.config.message_max_age_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        self.engine.clock().now().signed_duration_since(authored) > max_age
    }

    async fn extract_body(
        &self,
        record: &InboundRecord,
    ) -> Result<Option<(String, MessageType)>, ParleyError> {
        let extracted = match &record.content {
            RecordContent::Text { text: Some(text) } if !text.body.trim().is_empty() => {
                Some((text.body.clone(), MessageType::Text))
            }
            RecordContent::Audio { audio: Some(media) } => Some((
                self.media.transcribe_audio(media).await?,
                MessageType::Audio,
            )),
            RecordContent::Image { image: Some(media) } => Some((
                self.media.describe_image(media).await?,
                MessageType::Image,
            )),
            _ => None,
        };
        Ok(extracted.filter(|(body, _)| !body.trim().is_empty()))
    }

    async fn store_inbound(
        &self,
        user: &UserProfile,
        record: &InboundRecord,
        body: &str,
        message_type: MessageType,
    ) -> Result<(String, String), ParleyError> {
        let resolution = self
            .engine
            .resolve_or_create(&user.client_hub(), &self.channel, None)
            .await?;
        let mut data = MessageData::new(body, message_type, MessageOwner::User)
            .with_channel(self.channel.clone())
            .with_meta("original_message_id", record.id.clone())
            .with_meta("sender", record.from.clone());
        if let Some(authored) = record.timestamp.to_datetime() {
            data = data.with_meta("sent_at", authored.to_rfc3339());
        }
        let appended = self.engine.append(&resolution.conversation_id, data).await?;
        Ok((resolution.conversation_id, appended.message.id))
    }
}

fn content_kind(content: &RecordContent) -> &'static str {
    match content {
        RecordContent::Text { .. } => "text",
        RecordContent::Audio { .. } => "audio",
        RecordContent::Image { .. } => "image",
        RecordContent::Unsupported => "unsupported",
    }
}
