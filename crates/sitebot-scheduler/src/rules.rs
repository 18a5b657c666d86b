// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! When each notification rule fires.

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Weekday};
use sitebot_config::model::SchedulerConfig;
use sitebot_core::types::EventType;

/// The local hour (and day) a rule is allowed to run at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Every tick.
    Hourly,
    Daily { hour: u32 },
    Weekly { day: Weekday, hour: u32 },
}

impl Gate {
    pub fn is_open(self, local: &DateTime<FixedOffset>) -> bool {
        match self {
            Self::Hourly => true,
            Self::Daily { hour } => local.hour() == hour,
            Self::Weekly { day, hour } => local.weekday() == day && local.hour() == hour,
        }
    }
}

/// Gate of `rule` under `config`. `weekly_day` is the parsed `weekly_summary_day`.
pub fn gate(rule: EventType, config: &SchedulerConfig, weekly_day: Weekday) -> Gate {
    use EventType::*;
    match rule {
        PlanMorning => Gate::Daily {
            hour: config.morning_hour,
        },
        DirectorDigest => Gate::Daily {
            hour: config.digest_hour,
        },
        BriefingSupply | BriefingProduction | BriefingPto | BriefingInspector => Gate::Daily {
            hour: config.briefing_hour,
        },
        AlertOverdue | DocumentOverdue => Gate::Daily {
            hour: config.escalation_hour,
        },
        TaskDeadline | TaskOverdue => Gate::Hourly,
        ReportMissing => Gate::Daily {
            hour: config.missing_report_hour,
        },
        WeeklySummary => Gate::Weekly {
            day: weekly_day,
            hour: config.weekly_summary_hour,
        },
        EveningFact => Gate::Daily {
            hour: config.evening_fact_hour,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn local(d: u32, h: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 3, d, h, 0, 0)
            .unwrap()
    }

    #[test]
    fn daily_gates_follow_config_hours() {
        let config = SchedulerConfig::default();
        let digest = gate(EventType::DirectorDigest, &config, Weekday::Fri);
        assert!(digest.is_open(&local(6, 9)));
        assert!(!digest.is_open(&local(6, 10)));
        assert_eq!(
            gate(EventType::ReportMissing, &config, Weekday::Fri),
            Gate::Daily { hour: 17 }
        );
    }

    #[test]
    fn weekly_gate_needs_day_and_hour() {
        let config = SchedulerConfig::default();
        let weekly = gate(EventType::WeeklySummary, &config, Weekday::Fri);
        // 2026-03-06 is a Friday.
        assert!(weekly.is_open(&local(6, 18)));
        assert!(!weekly.is_open(&local(5, 18)));
        assert!(!weekly.is_open(&local(6, 17)));
    }

    #[test]
    fn task_sweeps_run_every_hour() {
        let config = SchedulerConfig::default();
        for hour in 0..24 {
            assert!(gate(EventType::TaskDeadline, &config, Weekday::Mon).is_open(&local(2, hour)));
        }
    }
}
