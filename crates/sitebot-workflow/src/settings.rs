// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime knobs of the conversation layer, derived from [`SiteConfig`].

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};
use sitebot_config::model::SiteConfig;

#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub bot_name: String,
    pub session_ttl: Duration,
    pub page_size: usize,
    /// Operating timezone used for "today" and for displayed times.
    pub offset: FixedOffset,
}

impl WorkflowSettings {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            bot_name: config.bot.name.clone(),
            session_ttl: Duration::hours(i64::from(config.bot.session_ttl_hours)),
            page_size: config.bot.page_size.max(1),
            offset: config.scheduler.offset().unwrap_or_else(|| Utc.fix()),
        }
    }

    /// Calendar date at `now` in the operating timezone.
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    /// `dd.mm HH:MM` in the operating timezone.
    pub fn local_time(&self, ts: DateTime<Utc>) -> String {
        ts.with_timezone(&self.offset).format("%d.%m %H:%M").to_string()
    }
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self::from_config(&SiteConfig::default())
    }
}
