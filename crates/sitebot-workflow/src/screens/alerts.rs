// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use sitebot_core::records::Alert;
use sitebot_core::types::{InlineButton, Keyboard};

use crate::callback;
use crate::render::Screen;
use crate::roles::{MenuAction, Surface};
use crate::screens::common::{SEP, back_button, escape, home_button, truncate};
use crate::settings::WorkflowSettings;

pub fn list(alerts: &[Alert], settings: &WorkflowSettings) -> Screen {
    let mut text = format!("<b>🚨 Open alerts</b>\n{SEP}\n");
    if alerts.is_empty() {
        text.push_str("No open alerts. 👍");
    }
    let mut keyboard = Keyboard::new();
    for alert in alerts {
        text.push_str(&format!(
            "{} {} · {} <i>{}</i>\n",
            alert.priority.icon(),
            escape(&truncate(&alert.title, 40)),
            escape(&alert.project_id),
            settings.local_time(alert.created_at)
        ));
        keyboard = keyboard.button(InlineButton::callback(
            format!("{} {}", alert.priority.icon(), truncate(&alert.title, 32)),
            callback::entity("alert", "view", alert.id),
        ));
    }
    Screen::new(text, keyboard.button(home_button()))
}

pub fn detail(surface: Surface, alert: &Alert, settings: &WorkflowSettings) -> Screen {
    let mut text = format!(
        "<b>{} {}</b>\n{SEP}\nProject: {}\nPriority: {}\nRaised: {}",
        alert.priority.icon(),
        escape(&alert.title),
        escape(&alert.project_id),
        alert.priority,
        settings.local_time(alert.created_at)
    );
    if let Some(description) = &alert.description {
        text.push_str(&format!("\n\n{}", escape(description)));
    }
    let mut keyboard = Keyboard::new();
    match alert.resolved_at {
        Some(at) if alert.is_resolved => {
            text.push_str(&format!("\n\n✅ Resolved {}", settings.local_time(at)));
        }
        _ if alert.is_resolved => text.push_str("\n\n✅ Resolved"),
        _ => {
            keyboard = keyboard.button(InlineButton::callback(
                "✅ Resolve",
                callback::entity("alert", "resolve", alert.id),
            ));
        }
    }
    keyboard = keyboard.row(vec![back_button(surface, MenuAction::Alerts), home_button()]);
    Screen::new(text, keyboard)
}
