// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use sitebot_core::types::{Approval, ApprovalStatus, DecisionOutcome, InlineButton, Keyboard};

use crate::callback;
use crate::render::Screen;
use crate::roles::{MenuAction, Surface};
use crate::screens::common::{SEP, back_button, escape, home_button, truncate};
use crate::settings::WorkflowSettings;

pub fn list(approvals: &[Approval], settings: &WorkflowSettings) -> Screen {
    let mut text = format!("<b>✍️ Pending approvals</b>\n{SEP}\n");
    if approvals.is_empty() {
        text.push_str("No approvals are waiting.");
    }
    let mut keyboard = Keyboard::new();
    for approval in approvals {
        text.push_str(&format!(
            "• L{} {} <i>{}</i>\n",
            approval.level,
            escape(&truncate(&approval.title, 48)),
            settings.local_time(approval.created_at)
        ));
        keyboard = keyboard.button(InlineButton::callback(
            truncate(&approval.title, 36),
            callback::entity("appr", "view", approval.id),
        ));
    }
    Screen::new(text, keyboard.button(home_button()))
}

pub fn detail(surface: Surface, approval: &Approval, settings: &WorkflowSettings) -> Screen {
    let mut text = format!(
        "<b>✍️ {}</b>\n{SEP}\nProject: {}\nType: {}\nLevel: {}\nRequested: {}",
        escape(&approval.title),
        escape(&approval.project_id),
        approval.kind,
        approval.level,
        settings.local_time(approval.created_at)
    );
    if let Some(by) = &approval.requested_by {
        text.push_str(&format!("\nBy: {}", escape(by)));
    }
    if let Some(description) = &approval.description {
        text.push_str(&format!("\n\n{}", escape(description)));
    }

    let mut keyboard = Keyboard::new();
    if approval.status == ApprovalStatus::Pending {
        keyboard = keyboard.row(vec![
            InlineButton::callback("✅ Approve", callback::entity("appr", "yes", approval.id)),
            InlineButton::callback("❌ Reject", callback::entity("appr", "no", approval.id)),
        ]);
    } else {
        text.push_str(&format!("\n\nStatus: <b>{}</b>", approval.status));
    }
    keyboard = keyboard.row(vec![back_button(surface, MenuAction::Approvals), home_button()]);
    Screen::new(text, keyboard)
}

/// Result of a decision. A second decision on the same approval reports the first one.
pub fn decided(surface: Surface, outcome: &DecisionOutcome) -> Screen {
    let (approval, headline) = match outcome {
        DecisionOutcome::Applied(a) => (
            a,
            match a.status {
                ApprovalStatus::Approved => "✅ Approved",
                ApprovalStatus::Rejected => "❌ Rejected",
                ApprovalStatus::Pending => "⏳ Pending",
            },
        ),
        DecisionOutcome::AlreadyDecided(a) => (a, "ℹ️ Already decided"),
    };
    let text = format!(
        "<b>{headline}</b>\n{SEP}\n{}\nStatus: <b>{}</b>",
        escape(&approval.title),
        approval.status
    );
    Screen::new(
        text,
        Keyboard::new().row(vec![back_button(surface, MenuAction::Approvals), home_button()]),
    )
}
