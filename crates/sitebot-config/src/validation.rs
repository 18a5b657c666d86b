// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express: bind addresses,
//! non-empty paths, hour ranges, and the timezone offset.

use crate::diagnostic::ConfigError;
use crate::model::SiteConfig;

/// Validate a deserialized configuration.
///
/// Collects every problem instead of failing on the first.
pub fn validate_config(config: &SiteConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::validation("gateway.host must not be empty"));
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        errors.push(ConfigError::validation(format!(
            "gateway.host `{host}` is not a valid IP address or hostname"
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    if config.bot.session_ttl_hours == 0 {
        errors.push(ConfigError::validation(
            "bot.session_ttl_hours must be at least 1",
        ));
    }

    if config.bot.page_size == 0 || config.bot.page_size > 20 {
        errors.push(ConfigError::validation(format!(
            "bot.page_size must be between 1 and 20, got {}",
            config.bot.page_size
        )));
    }

    if let Some(token) = &config.telegram.bot_token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::validation(
            "telegram.bot_token must not be empty when set",
        ));
    }

    let scheduler = &config.scheduler;
    if !(-12..=14).contains(&scheduler.utc_offset_hours) {
        errors.push(ConfigError::validation(format!(
            "scheduler.utc_offset_hours must be between -12 and 14, got {}",
            scheduler.utc_offset_hours
        )));
    }

    let hours = [
        ("morning_hour", scheduler.morning_hour),
        ("briefing_hour", scheduler.briefing_hour),
        ("digest_hour", scheduler.digest_hour),
        ("escalation_hour", scheduler.escalation_hour),
        ("missing_report_hour", scheduler.missing_report_hour),
        ("weekly_summary_hour", scheduler.weekly_summary_hour),
        ("evening_fact_hour", scheduler.evening_fact_hour),
    ];
    for (key, hour) in hours {
        if hour > 23 {
            errors.push(ConfigError::validation(format!(
                "scheduler.{key} must be between 0 and 23, got {hour}"
            )));
        }
    }

    if scheduler.weekly_weekday().is_none() {
        errors.push(ConfigError::validation(format!(
            "scheduler.weekly_summary_day `{}` is not a weekday name",
            scheduler.weekly_summary_day
        )));
    }

    if scheduler.deadline_window_hours == 0 {
        errors.push(ConfigError::validation(
            "scheduler.deadline_window_hours must be at least 1",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
