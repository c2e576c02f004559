// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent reply generation.

use async_trait::async_trait;
use parley_core::{Message, ParleyError};

use crate::directory::UserProfile;

/// Produces the agent's answer to an inbound message.
#[async_trait]
pub trait ReplyGenerator: Send + Sync + 'static {
    /// `context` holds the client's recent messages, oldest first, including
    /// the one being answered.
    async fn generate(
        &self,
        user: &UserProfile,
        message: &str,
        context: &[Message],
    ) -> Result<String, ParleyError>;
}

/// Deterministic stand-in agent: picks one of five replies by the length of
/// the inbound message.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedReplyGenerator;

impl CannedReplyGenerator {
    pub fn reply_for(user: &UserProfile, message: &str) -> String {
        match message.chars().count() % 5 {
            0 => format!("Hi {}! I got your message: '{message}'", user.first_name),
            1 => "How can I help you today?".to_string(),
            2 => "Interesting! Tell me more about that.".to_string(),
            3 => "Got it. Is there anything else you would like to know?".to_string(),
            _ => "Thanks for the message. I'll look into it for you.".to_string(),
        }
    }
}

#[async_trait]
impl ReplyGenerator for CannedReplyGenerator {
    async fn generate(
        &self,
        user: &UserProfile,
        message: &str,
        _context: &[Message],
    ) -> Result<String, ParleyError> {
        Ok(Self::reply_for(user, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ana() -> UserProfile {
        UserProfile {
            id: 1,
            first_name: "Ana".into(),
            last_name: String::new(),
            phone: None,
        }
    }

    #[test]
    fn reply_depends_on_length() {
        let user = ana();
        assert_eq!(
            CannedReplyGenerator::reply_for(&user, "hello"),
            "Hi Ana! I got your message: 'hello'"
        );
        assert_eq!(
            CannedReplyGenerator::reply_for(&user, "hi"),
            "Interesting! Tell me more about that."
        );
        assert_eq!(
            CannedReplyGenerator::reply_for(&user, "x"),
            "How can I help you today?"
        );
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // Two characters, four bytes.
        assert_eq!(
            CannedReplyGenerator::reply_for(&ana(), "éé"),
            "Interesting! Tell me more about that."
        );
    }

    #[tokio::test]
    async fn generator_is_stable() {
        let a = CannedReplyGenerator.generate(&ana(), "abcd", &[]).await.unwrap();
        let b = CannedReplyGenerator.generate(&ana(), "abcd", &[]).await.unwrap();
        assert_eq!(a, b);
    }
}
