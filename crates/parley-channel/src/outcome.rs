// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

/// What happened to an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OutcomeStatus {
    NoMessage,
    Expired,
    UserNotFound,
    NoContent,
    /// Inbound message stored; the reply is still being produced.
    Accepted,
    Processed,
    Error,
}

/// Result of handling one inbound event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
}

impl Outcome {
    pub fn new(status: OutcomeStatus) -> Self {
        Self {
            status,
            conversation_id: None,
            response_text: None,
            processing_time_ms: None,
            error: None,
            max_age_seconds: None,
            message_type: None,
            sender: None,
        }
    }

    pub fn no_message() -> Self {
        Self::new(OutcomeStatus::NoMessage)
    }

    pub fn expired(max_age_seconds: u64) -> Self {
        Self {
            max_age_seconds: Some(max_age_seconds),
            ..Self::new(OutcomeStatus::Expired)
        }
    }

    pub fn user_not_found(sender: impl Into<String>) -> Self {
        Self {
            sender: Some(sender.into()),
            ..Self::new(OutcomeStatus::UserNotFound)
        }
    }

    pub fn no_content(message_type: impl Into<String>) -> Self {
        Self {
            message_type: Some(message_type.into()),
            ..Self::new(OutcomeStatus::NoContent)
        }
    }

    pub fn accepted(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: Some(conversation_id.into()),
            ..Self::new(OutcomeStatus::Accepted)
        }
    }

    pub fn processed(
        conversation_id: impl Into<String>,
        response_text: impl Into<String>,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            conversation_id: Some(conversation_id.into()),
            response_text: Some(response_text.into()),
            processing_time_ms: Some(processing_time_ms),
            ..Self::new(OutcomeStatus::Processed)
        }
    }

    pub fn error(error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(OutcomeStatus::Error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_only_present_fields() {
        assert_eq!(
            serde_json::to_value(Outcome::expired(300)).unwrap(),
            json!({"status": "expired", "max_age_seconds": 300})
        );
        assert_eq!(
            serde_json::to_value(Outcome::processed("c-1", "hi", 12)).unwrap(),
            json!({
                "status": "processed",
                "conversation_id": "c-1",
                "response_text": "hi",
                "processing_time_ms": 12
            })
        );
        assert_eq!(
            serde_json::to_value(Outcome::user_not_found("+1")).unwrap(),
            json!({"status": "user_not_found", "sender": "+1"})
        );
    }

    #[test]
    fn status_display_matches_wire_name() {
        assert_eq!(OutcomeStatus::NoContent.to_string(), "no_content");
        assert_eq!(OutcomeStatus::UserNotFound.to_string(), "user_not_found");
    }
}
