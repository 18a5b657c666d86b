// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inspector stage acceptance screens.

use sitebot_core::records::{StageAcceptance, StageOutcome, StageStatus};
use sitebot_core::types::{InlineButton, Keyboard};

use crate::callback;
use crate::render::Screen;
use crate::roles::{MenuAction, Surface};
use crate::screens::common::{SEP, back_button, escape, home_button, truncate};
use crate::settings::WorkflowSettings;

/// Stages with decision buttons; more rows than this are listed without buttons.
const DECIDABLE: usize = 4;

fn location(stage: &StageAcceptance) -> String {
    let facade = stage.facade_name.as_deref().unwrap_or("-");
    match stage.floor_number {
        Some(floor) => format!("{} · floor {floor}", escape(facade)),
        None => escape(facade),
    }
}

fn status_mark(status: StageStatus) -> &'static str {
    match status {
        StageStatus::PendingInspector => "⏳",
        StageStatus::Accepted => "✅",
        StageStatus::Rejected => "❌",
    }
}

pub fn list(stages: &[StageAcceptance], settings: &WorkflowSettings) -> Screen {
    let mut text = format!("<b>✅ Stage acceptance</b>\n{SEP}\n");
    if stages.is_empty() {
        text.push_str("No stages are waiting for acceptance.");
    } else {
        text.push_str(&format!("Waiting: <b>{}</b>\n\n", stages.len()));
    }
    let mut keyboard = Keyboard::new();
    for (n, stage) in stages.iter().enumerate() {
        text.push_str(&format!(
            "{}. <b>{}</b>\n   {} <i>{}</i>\n",
            n + 1,
            escape(&stage.stage),
            location(stage),
            settings.local_time(stage.created_at)
        ));
        if let Some(notes) = &stage.notes {
            text.push_str(&format!("   <i>{}</i>\n", escape(&truncate(notes, 40))));
        }
        if n < DECIDABLE {
            keyboard = keyboard.row(vec![
                InlineButton::callback(
                    format!("✅ {}", truncate(&stage.stage, 16)),
                    callback::entity("stage", "yes", stage.id),
                ),
                InlineButton::callback("❌", callback::entity("stage", "no", stage.id)),
            ]);
        }
    }
    Screen::new(text, keyboard.button(home_button()))
}

pub fn history(stages: &[StageAcceptance], settings: &WorkflowSettings) -> Screen {
    let mut text = format!("<b>📊 Inspection history</b>\n{SEP}\n");
    if stages.is_empty() {
        text.push_str("No inspections recorded yet.");
    }
    for stage in stages {
        let when = stage
            .inspected_at
            .map(|ts| settings.local_time(ts))
            .unwrap_or_default();
        text.push_str(&format!(
            "{} {} · {} <i>{when}</i>\n",
            status_mark(stage.status),
            escape(&stage.stage),
            location(stage)
        ));
    }
    Screen::new(
        text,
        Keyboard::new().row(vec![
            back_button(Surface::Inspector, MenuAction::Accept),
            home_button(),
        ]),
    )
}

/// Result of a verdict. A second verdict on the same stage reports the first one.
pub fn decided(outcome: &StageOutcome) -> Screen {
    let (stage, headline) = match outcome {
        StageOutcome::Applied(s) => (
            s,
            match s.status {
                StageStatus::Accepted => "✅ Stage accepted",
                StageStatus::Rejected => "❌ Stage rejected",
                StageStatus::PendingInspector => "⏳ Pending",
            },
        ),
        StageOutcome::AlreadyDecided(s) => (s, "ℹ️ Already decided"),
    };
    let text = format!(
        "<b>{headline}</b>\n{SEP}\n{}\n{}\nStatus: <b>{}</b>",
        escape(&stage.stage),
        location(stage),
        stage.status
    );
    Screen::new(
        text,
        Keyboard::new().row(vec![
            back_button(Surface::Inspector, MenuAction::Accept),
            home_button(),
        ]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn stage(id: i64, status: StageStatus) -> StageAcceptance {
        StageAcceptance {
            id,
            project_id: "p1".into(),
            facade_id: Some("fa".into()),
            floor_id: Some("fa12".into()),
            stage: "Brackets <axis 3>".into(),
            notes: Some("Check anchors".into()),
            status,
            facade_name: Some("A".into()),
            floor_number: Some(12),
            inspector_id: None,
            inspected_at: None,
            accepted_at: None,
            created_at: Utc.with_ymd_and_hms(2026, 3, 6, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn only_the_first_stages_get_buttons() {
        let stages: Vec<_> = (1..=6).map(|id| stage(id, StageStatus::PendingInspector)).collect();
        let screen = list(&stages, &WorkflowSettings::default());
        let callbacks = screen.callbacks();
        assert_eq!(callbacks.len(), DECIDABLE * 2 + 1);
        assert_eq!(&callbacks[..2], &["stage:yes:1", "stage:no:1"]);
        assert!(!callbacks.contains(&"stage:yes:5"));
        assert!(screen.text.contains("Waiting: <b>6</b>"));
        assert!(screen.text.contains("Brackets &lt;axis 3&gt;"));
        assert!(screen.text.contains("A · floor 12"));
    }

    #[test]
    fn empty_list_says_so() {
        let screen = list(&[], &WorkflowSettings::default());
        assert!(screen.text.contains("No stages are waiting"));
        assert_eq!(screen.callbacks(), vec!["nav:home"]);
    }

    #[test]
    fn second_verdict_reports_the_first() {
        let screen = decided(&StageOutcome::AlreadyDecided(stage(3, StageStatus::Accepted)));
        assert!(screen.text.contains("Already decided"));
        assert!(screen.text.contains("accepted"));
        assert_eq!(screen.callbacks(), vec!["i:accept", "nav:home"]);
    }

    #[test]
    fn history_marks_each_verdict() {
        let mut rejected = stage(2, StageStatus::Rejected);
        rejected.floor_number = None;
        let screen = history(
            &[stage(1, StageStatus::Accepted), rejected],
            &WorkflowSettings::default(),
        );
        assert!(screen.text.contains("✅ Brackets"));
        assert!(screen.text.contains("❌ Brackets"));
        assert!(screen.text.contains("· A <i>"));
    }
}
