// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use sitebot_core::records::{Task, TaskStatus};
use sitebot_core::types::{InlineButton, Keyboard};

use crate::callback;
use crate::render::Screen;
use crate::screens::common::{SEP, escape, home_button, truncate};
use crate::settings::WorkflowSettings;

fn status_mark(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "⬜",
        TaskStatus::InProgress => "🔄",
        TaskStatus::Done => "✅",
    }
}

/// The user's tasks, each with the button for its next status.
pub fn list(tasks: &[Task], settings: &WorkflowSettings, hint: Option<&str>) -> Screen {
    let mut text = format!("<b>✔️ My tasks</b>\n{SEP}\n");
    if let Some(hint) = hint {
        text.push_str(&format!("<i>{}</i>\n\n", escape(hint)));
    }
    if tasks.is_empty() {
        text.push_str("No open tasks.");
    }
    let mut keyboard = Keyboard::new();
    for task in tasks {
        text.push_str(&format!(
            "{} {} {}",
            status_mark(task.status),
            task.priority.icon(),
            escape(&task.title)
        ));
        if let Some(deadline) = task.deadline {
            text.push_str(&format!(" <i>until {}</i>", settings.local_time(deadline)));
        }
        text.push('\n');

        let short = truncate(&task.title, 28);
        match task.status {
            TaskStatus::Todo => {
                keyboard = keyboard.button(InlineButton::callback(
                    format!("▶️ {short}"),
                    callback::entity("task", "start", task.id),
                ));
            }
            TaskStatus::InProgress => {
                keyboard = keyboard.button(InlineButton::callback(
                    format!("✅ {short}"),
                    callback::entity("task", "done", task.id),
                ));
            }
            TaskStatus::Done => {}
        }
    }
    Screen::new(text, keyboard.button(home_button()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitebot_core::types::Priority;

    fn task(id: i64, status: TaskStatus) -> Task {
        Task {
            id,
            project_id: "p1".into(),
            title: format!("Task {id}"),
            description: None,
            status,
            priority: Priority::High,
            assigned_to: Some("u1".into()),
            assigned_role: None,
            deadline: None,
            reminder_sent: false,
        }
    }

    #[test]
    fn buttons_follow_status() {
        let screen = list(
            &[task(1, TaskStatus::Todo), task(2, TaskStatus::InProgress), task(3, TaskStatus::Done)],
            &WorkflowSettings::default(),
            None,
        );
        assert_eq!(screen.callbacks(), vec!["task:start:1", "task:done:2", "nav:home"]);
    }
}
