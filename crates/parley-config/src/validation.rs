// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths, positive sizes, and a parseable bind host.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::{MAX_CLEANUP_DAYS, MAX_IDLE_TIMEOUT_MINUTES, ParleyConfig};

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &ParleyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::invalid("storage.database_path must not be empty"));
    }

    let conv = &config.conversation;
    if !(0..=MAX_IDLE_TIMEOUT_MINUTES).contains(&conv.idle_timeout_minutes) {
        errors.push(ConfigError::invalid(format!(
            "conversation.idle_timeout_minutes must be between 0 and {MAX_IDLE_TIMEOUT_MINUTES}, got {}",
            conv.idle_timeout_minutes
        )));
    }
    if conv.max_message_length == 0 {
        errors.push(ConfigError::invalid(
            "conversation.max_message_length must be at least 1",
        ));
    }
    if conv.max_history == 0 {
        errors.push(ConfigError::invalid("conversation.max_history must be at least 1"));
    }
    if !(1..=MAX_CLEANUP_DAYS).contains(&conv.cleanup_days_old) {
        errors.push(ConfigError::invalid(format!(
            "conversation.cleanup_days_old must be between 1 and {MAX_CLEANUP_DAYS}, got {}",
            conv.cleanup_days_old
        )));
    }
    if conv.cleanup_batch_size == 0 {
        errors.push(ConfigError::invalid(
            "conversation.cleanup_batch_size must be at least 1",
        ));
    }
    for (i, keyword) in conv.close_keywords.iter().enumerate() {
        if keyword.trim().is_empty() {
            errors.push(ConfigError::invalid(format!(
                "conversation.close_keywords[{i}] must not be blank"
            )));
        }
    }

    let host = config.gateway.host.trim();
    let host_ok = host.parse::<std::net::IpAddr>().is_ok()
        || (!host.is_empty()
            && host
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-'));
    if !host_ok {
        errors.push(ConfigError::invalid(format!(
            "gateway.host `{host}` is not a valid IP address or hostname"
        )));
    }

    let mut phones = HashSet::new();
    for user in &config.whatsapp.allowed_users {
        if user.phone.trim().is_empty() {
            errors.push(ConfigError::invalid(format!(
                "whatsapp.allowed_users entry with id {} has an empty phone",
                user.id
            )));
        } else if !phones.insert(user.phone.as_str()) {
            errors.push(ConfigError::invalid(format!(
                "duplicate phone `{}` in whatsapp.allowed_users",
                user.phone
            )));
        }
    }

    if config.whatsapp.api_token.is_some() && config.whatsapp.phone_number_id.is_none() {
        errors.push(ConfigError::invalid(
            "whatsapp.phone_number_id is required when whatsapp.api_token is set",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
