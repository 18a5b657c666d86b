// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! What a tick did, per rule.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sitebot_core::types::EventType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleReport {
    pub rule: EventType,
    /// Events inserted into the queue.
    pub enqueued: u32,
    /// Scopes that already had an event today.
    pub skipped_duplicate: u32,
    /// Recipients who switched the notification off.
    pub skipped_preference: u32,
    /// Set when the rule failed part-way; earlier inserts are kept.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RuleReport {
    pub fn new(rule: EventType) -> Self {
        Self {
            rule,
            enqueued: 0,
            skipped_duplicate: 0,
            skipped_preference: 0,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// The instant evaluated, in UTC.
    pub at: DateTime<Utc>,
    /// Local operating time of the tick, `YYYY-MM-DD HH:MM`.
    pub local_time: String,
    /// Rules whose gate was open (or the single requested rule).
    pub rules: Vec<RuleReport>,
    /// Idle sessions past their time-to-live, deleted after the rules ran.
    /// Always 0 for a single-rule tick.
    pub sessions_purged: usize,
}

impl TickReport {
    pub fn rule(&self, rule: EventType) -> Option<&RuleReport> {
        self.rules.iter().find(|r| r.rule == rule)
    }

    pub fn total_enqueued(&self) -> u32 {
        self.rules.iter().map(|r| r.enqueued).sum()
    }

    pub fn has_errors(&self) -> bool {
        self.rules.iter().any(|r| r.error.is_some())
    }
}
