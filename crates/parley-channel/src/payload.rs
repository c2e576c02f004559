// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp-style webhook envelope.
//!
//! Only the fields needed to drive a conversation are modelled; anything else
//! in the vendor payload (contacts, statuses, metadata) is ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level webhook body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: String,
    pub value: ChangeValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messaging_product: String,
    #[serde(default)]
    pub messages: Vec<InboundRecord>,
}

/// One inbound message as the channel delivers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundRecord {
    pub id: String,
    pub from: String,
    pub timestamp: RawTimestamp,
    #[serde(flatten)]
    pub content: RecordContent,
}

/// Message content, discriminated by the wire `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecordContent {
    Text {
        #[serde(default)]
        text: Option<TextBody>,
    },
    Audio {
        #[serde(default)]
        audio: Option<MediaRef>,
    },
    Image {
        #[serde(default)]
        image: Option<MediaRef>,
    },
    /// Any type this service does not handle (stickers, locations, ...).
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBody {
    pub body: String,
}

/// Reference to media stored by the channel provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub id: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<bool>,
}

impl MediaRef {
    pub fn new(id: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mime_type: Some(mime_type.into()),
            sha256: None,
            caption: None,
            voice: None,
        }
    }
}

/// Unix-seconds timestamp, sent as a string by the provider and as a number
/// by some test tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Seconds(i64),
    Text(String),
}

impl RawTimestamp {
    pub fn from_datetime(ts: DateTime<Utc>) -> Self {
        Self::Text(ts.timestamp().to_string())
    }

    /// The authored instant, or `None` when the value is not a Unix time.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let secs = match self {
            Self::Seconds(secs) => *secs,
            Self::Text(raw) => {
                let raw = raw.trim();
                match raw.parse::<i64>() {
                    Ok(secs) => secs,
                    // Fractional seconds are truncated.
                    Err(_) => raw.parse::<f64>().ok().filter(|f| f.is_finite())? as i64,
                }
            }
        };
        DateTime::from_timestamp(secs, 0)
    }
}

impl WebhookPayload {
    /// The first message carried by the envelope, if any.
    pub fn first_message(&self) -> Option<&InboundRecord> {
        self.entry
            .iter()
            .flat_map(|entry| &entry.changes)
            .flat_map(|change| &change.value.messages)
            .next()
    }

    /// Wraps a single record in a one-entry envelope.
    pub fn single(record: InboundRecord) -> Self {
        Self {
            object: "whatsapp_business_account".to_string(),
            entry: vec![Entry {
                id: "local_entry".to_string(),
                changes: vec![Change {
                    field: "messages".to_string(),
                    value: ChangeValue {
                        messaging_product: "whatsapp".to_string(),
                        messages: vec![record],
                    },
                }],
            }],
        }
    }

    /// An envelope with no messages (e.g. a status-only notification).
    pub fn empty() -> Self {
        Self {
            object: "whatsapp_business_account".to_string(),
            entry: Vec::new(),
        }
    }

    /// A text message from `from`, authored at `at`.
    pub fn text(from: impl Into<String>, body: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::single(local_record(
            from.into(),
            at,
            RecordContent::Text {
                text: Some(TextBody { body: body.into() }),
            },
        ))
    }

    /// A voice note from `from`, authored at `at`.
    pub fn audio(from: impl Into<String>, media_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        let mut media = MediaRef::new(media_id, "audio/ogg; codecs=opus");
        media.voice = Some(true);
        Self::single(local_record(
            from.into(),
            at,
            RecordContent::Audio { audio: Some(media) },
        ))
    }

    /// An image from `from`, authored at `at`.
    pub fn image(from: impl Into<String>, media_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::single(local_record(
            from.into(),
            at,
            RecordContent::Image {
                image: Some(MediaRef::new(media_id, "image/jpeg")),
            },
        ))
    }
}

fn local_record(from: String, at: DateTime<Utc>, content: RecordContent) -> InboundRecord {
    InboundRecord {
        id: format!("local_{}", uuid::Uuid::new_v4()),
        from,
        timestamp: RawTimestamp::from_datetime(at),
        content,
    }
}
