// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Parley.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Parley configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParleyConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Conversation lifecycle settings.
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Inbound admission settings shared by all channels.
    #[serde(default)]
    pub channel: ChannelConfig,

    /// WhatsApp Cloud API integration settings.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used in logs and health responses.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "parley".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("parley").join("parley.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("parley.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Upper bound for any idle timeout, initial or extended (ten years).
pub const MAX_IDLE_TIMEOUT_MINUTES: i64 = 10 * 365 * 24 * 60;

/// Upper bound for the sweep's age threshold (ten years).
pub const MAX_CLEANUP_DAYS: i64 = 10 * 365;

/// Conversation lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationConfig {
    /// Idle minutes after which an ACTIVE conversation times out.
    #[serde(default = "default_idle_timeout_minutes")]
    pub idle_timeout_minutes: i64,

    /// Maximum accepted message body length, in characters.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,

    /// Phrases that close the conversation when sent by an agent.
    /// Matched case-insensitively as substrings of the trimmed body.
    #[serde(default = "default_close_keywords")]
    pub close_keywords: Vec<String>,

    /// Upper bound for history requests.
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Closed conversations untouched for this many days are marked expired.
    #[serde(default = "default_cleanup_days_old")]
    pub cleanup_days_old: i64,

    /// Maximum conversations marked expired per sweep.
    #[serde(default = "default_cleanup_batch_size")]
    pub cleanup_batch_size: usize,

    /// Minutes between background sweeps while serving. 0 disables them.
    #[serde(default = "default_cleanup_interval_minutes")]
    pub cleanup_interval_minutes: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            idle_timeout_minutes: default_idle_timeout_minutes(),
            max_message_length: default_max_message_length(),
            close_keywords: default_close_keywords(),
            max_history: default_max_history(),
            cleanup_days_old: default_cleanup_days_old(),
            cleanup_batch_size: default_cleanup_batch_size(),
            cleanup_interval_minutes: default_cleanup_interval_minutes(),
        }
    }
}

fn default_cleanup_interval_minutes() -> u64 {
    60
}

fn default_idle_timeout_minutes() -> i64 {
    2
}

fn default_max_message_length() -> usize {
    4000
}

/// Default closing phrases (Portuguese and English).
pub fn default_close_keywords() -> Vec<String> {
    [
        "conversa encerrada",
        "atendimento finalizado",
        "pode fechar o atendimento",
        "obrigado pelo contato",
        "até a próxima",
        "/close",
        "/end",
        "conversation ended",
        "support finished",
        "thank you for contacting",
        "see you next time",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_max_history() -> usize {
    1000
}

fn default_cleanup_days_old() -> i64 {
    30
}

fn default_cleanup_batch_size() -> usize {
    100
}

/// Inbound admission configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    /// Inbound messages authored longer ago than this are rejected as stale.
    #[serde(default = "default_message_max_age_secs")]
    pub message_max_age_secs: u64,

    /// Recorded in reply metadata as `agent_type`.
    #[serde(default = "default_agent_type")]
    pub agent_type: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            message_max_age_secs: default_message_max_age_secs(),
            agent_type: default_agent_type(),
        }
    }
}

fn default_message_max_age_secs() -> u64 {
    300
}

fn default_agent_type() -> String {
    "local_agent".to_string()
}

/// WhatsApp Cloud API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Token expected in `hub.verify_token` during webhook verification.
    /// `None` rejects every verification attempt.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// Bearer token for the Graph API. `None` logs replies instead of sending.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Sending phone number id.
    #[serde(default)]
    pub phone_number_id: Option<String>,

    /// App secret used to check `X-Hub-Signature-256` on webhook posts.
    /// Signatures are not checked when unset.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Graph API base URL including version.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Phone numbers allowed to talk to the service.
    #[serde(default)]
    pub allowed_users: Vec<AllowedUser>,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            verify_token: None,
            api_token: None,
            phone_number_id: None,
            app_secret: None,
            api_base_url: default_api_base_url(),
            allowed_users: Vec::new(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://graph.facebook.com/v22.0".to_string()
}

/// One entry of the WhatsApp allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AllowedUser {
    pub phone: String,
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5001
}
