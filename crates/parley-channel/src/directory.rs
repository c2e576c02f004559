// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sender lookup: maps a channel address to a known user.

use async_trait::async_trait;
use parley_config::model::AllowedUser;
use parley_core::ParleyError;
use serde::{Deserialize, Serialize};

/// A user the service is willing to talk to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Channel address the user writes from, when known.
    pub phone: Option<String>,
}

impl UserProfile {
    /// Partition key for this user's conversations.
    pub fn client_hub(&self) -> String {
        format!("user_{}", self.id)
    }
}

/// Resolves a sender address to a [`UserProfile`].
#[async_trait]
pub trait UserDirectory: Send + Sync + 'static {
    /// `Ok(None)` means the sender is unknown and must be turned away.
    async fn lookup(&self, sender: &str) -> Result<Option<UserProfile>, ParleyError>;
}

/// Directory for the local harness: every sender is a known user.
///
/// `"user_<n>"` resolves to id `n`; anything else resolves to id 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalUserDirectory;

#[async_trait]
impl UserDirectory for LocalUserDirectory {
    async fn lookup(&self, sender: &str) -> Result<Option<UserProfile>, ParleyError> {
        let id = sender
            .strip_prefix("user_")
            .and_then(|n| n.parse::<i64>().ok())
            .unwrap_or(1);
        Ok(Some(UserProfile {
            id,
            first_name: "Local".to_string(),
            last_name: "User".to_string(),
            phone: Some(sender.to_string()),
        }))
    }
}

/// Directory backed by the configured `whatsapp.allowed_users` list.
///
/// Phones are compared on their digits only, so `+55 11 99999-0000` and
/// `5511999990000` are the same sender.
#[derive(Debug, Clone, Default)]
pub struct AllowListDirectory {
    users: Vec<(String, UserProfile)>,
}

impl AllowListDirectory {
    pub fn new(allowed: &[AllowedUser]) -> Self {
        let users = allowed
            .iter()
            .map(|user| {
                (
                    digits(&user.phone),
                    UserProfile {
                        id: user.id,
                        first_name: user.first_name.clone(),
                        last_name: user.last_name.clone(),
                        phone: Some(user.phone.clone()),
                    },
                )
            })
            .collect();
        Self { users }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for AllowListDirectory {
    async fn lookup(&self, sender: &str) -> Result<Option<UserProfile>, ParleyError> {
        let wanted = digits(sender);
        if wanted.is_empty() {
            return Ok(None);
        }
        Ok(self
            .users
            .iter()
            .find(|(phone, _)| *phone == wanted)
            .map(|(_, profile)| profile.clone()))
    }
}

fn digits(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}
