// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Sitebot operations bot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Sitebot configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Conversation behavior settings.
    #[serde(default)]
    pub bot: BotConfig,

    /// Telegram Bot API settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP surface settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Notification scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Conversation behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Name shown in the welcome screen.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Hours of inactivity after which a session is forgotten.
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u32,

    /// Rows per page on list screens.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
            session_ttl_hours: default_session_ttl_hours(),
            page_size: default_page_size(),
        }
    }
}

fn default_bot_name() -> String {
    "Sitebot".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_session_ttl_hours() -> u32 {
    8
}

fn default_page_size() -> usize {
    5
}

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot API token. `None` disables outbound delivery.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Bot API base URL, overridable for tests and self-hosted API servers.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Expected value of the `X-Telegram-Bot-Api-Secret-Token` webhook header.
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base_url: default_api_base_url(),
            webhook_secret: None,
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.telegram.org".to_string()
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
        .map(|p| p.join("sitebot").join("sitebot.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("sitebot.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// HTTP surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token required by `POST /scheduler/tick`. `None` rejects every tick request.
    #[serde(default)]
    pub scheduler_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            scheduler_token: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Notification scheduler configuration.
///
/// Hours are local hours in the operating timezone given by `utc_offset_hours`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Offset of the operating timezone from UTC, in hours.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,

    /// Run the hourly tick from an in-process timer instead of an external trigger.
    #[serde(default)]
    pub internal_timer: bool,

    #[serde(default = "default_morning_hour")]
    pub morning_hour: u32,

    #[serde(default = "default_briefing_hour")]
    pub briefing_hour: u32,

    #[serde(default = "default_digest_hour")]
    pub digest_hour: u32,

    #[serde(default = "default_escalation_hour")]
    pub escalation_hour: u32,

    #[serde(default = "default_missing_report_hour")]
    pub missing_report_hour: u32,

    #[serde(default = "default_weekly_summary_hour")]
    pub weekly_summary_hour: u32,

    /// Weekday of the weekly summary (`mon` .. `sun`).
    #[serde(default = "default_weekly_summary_day")]
    pub weekly_summary_day: String,

    #[serde(default = "default_evening_fact_hour")]
    pub evening_fact_hour: u32,

    /// How far ahead a task deadline triggers a reminder.
    #[serde(default = "default_deadline_window_hours")]
    pub deadline_window_hours: u32,

    /// Age after which an unresolved alert is escalated.
    #[serde(default = "default_escalation_after_hours")]
    pub escalation_after_hours: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset_hours(),
            internal_timer: false,
            morning_hour: default_morning_hour(),
            briefing_hour: default_briefing_hour(),
            digest_hour: default_digest_hour(),
            escalation_hour: default_escalation_hour(),
            missing_report_hour: default_missing_report_hour(),
            weekly_summary_hour: default_weekly_summary_hour(),
            weekly_summary_day: default_weekly_summary_day(),
            evening_fact_hour: default_evening_fact_hour(),
            deadline_window_hours: default_deadline_window_hours(),
            escalation_after_hours: default_escalation_after_hours(),
        }
    }
}

fn default_utc_offset_hours() -> i32 {
    3
}

fn default_morning_hour() -> u32 {
    8
}

fn default_briefing_hour() -> u32 {
    8
}

fn default_digest_hour() -> u32 {
    9
}

fn default_escalation_hour() -> u32 {
    10
}

fn default_missing_report_hour() -> u32 {
    17
}

fn default_weekly_summary_hour() -> u32 {
    18
}

fn default_weekly_summary_day() -> String {
    "fri".to_string()
}

fn default_evening_fact_hour() -> u32 {
    19
}

fn default_deadline_window_hours() -> u32 {
    24
}

fn default_escalation_after_hours() -> u32 {
    24
}

impl SchedulerConfig {
    /// The operating timezone as a fixed offset.
    pub fn offset(&self) -> Option<chrono::FixedOffset> {
        chrono::FixedOffset::east_opt(self.utc_offset_hours.checked_mul(3600)?)
    }

    /// The weekly summary weekday.
    pub fn weekly_weekday(&self) -> Option<chrono::Weekday> {
        self.weekly_summary_day.parse().ok()
    }
}
