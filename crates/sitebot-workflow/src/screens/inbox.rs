// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use sitebot_core::types::{InboxItem, InboxStatus, InlineButton, Keyboard};

use crate::callback;
use crate::render::Screen;
use crate::roles::{MenuAction, Surface};
use crate::screens::common::{SEP, back_button, escape, home_button, truncate};
use crate::settings::WorkflowSettings;

fn status_mark(status: InboxStatus) -> &'static str {
    match status {
        InboxStatus::New => "🆕",
        InboxStatus::Read => "👁",
        InboxStatus::Processed => "✅",
    }
}

pub fn list(items: &[InboxItem], settings: &WorkflowSettings) -> Screen {
    let mut text = format!("<b>📥 Inbox</b>\n{SEP}\n");
    if items.is_empty() {
        text.push_str("Nothing here yet.");
    }
    let mut keyboard = Keyboard::new();
    for item in items {
        text.push_str(&format!(
            "{} {} {} <i>{}</i>\n",
            status_mark(item.status),
            item.kind.icon(),
            escape(&truncate(&item.title, 48)),
            settings.local_time(item.created_at)
        ));
        keyboard = keyboard.button(InlineButton::callback(
            format!("{} {}", item.kind.icon(), truncate(&item.title, 32)),
            callback::entity("inbox", "open", item.id),
        ));
    }
    Screen::new(text, keyboard.button(home_button()))
}

pub fn detail(surface: Surface, item: &InboxItem, settings: &WorkflowSettings) -> Screen {
    let mut text = format!(
        "<b>{} {}</b>\n{SEP}\nFrom: {}\nReceived: {}\nStatus: {}",
        item.kind.icon(),
        escape(&item.title),
        item.from_role.label(),
        settings.local_time(item.created_at),
        item.status
    );
    if let Some(project) = &item.project_id {
        text.push_str(&format!("\nProject: {}", escape(project)));
    }
    if let Some(description) = &item.description {
        text.push_str(&format!("\n\n{}", escape(description)));
    }

    let mut keyboard = Keyboard::new();
    if let Some(reference) = &item.file_reference {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            keyboard = keyboard.button(InlineButton::url("📎 Open file", reference));
        } else {
            text.push_str(&format!("\n\nFile: <code>{}</code>", escape(reference)));
        }
    }
    if item.status != InboxStatus::Processed {
        keyboard = keyboard.button(InlineButton::callback(
            "✅ Processed",
            callback::entity("inbox", "done", item.id),
        ));
    }
    keyboard = keyboard.row(vec![back_button(surface, MenuAction::Inbox), home_button()]);
    Screen::new(text, keyboard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sitebot_core::Role;
    use sitebot_core::types::InboxKind;

    fn item(status: InboxStatus, file: Option<&str>) -> InboxItem {
        let at = Utc.with_ymd_and_hms(2026, 3, 6, 9, 0, 0).unwrap();
        InboxItem {
            id: 9,
            project_id: Some("p1".into()),
            from_role: Role::Foreman2,
            from_user_id: Some("u1".into()),
            to_roles: vec![Role::Pm],
            kind: InboxKind::Document,
            title: "Drawing <rev 2>".into(),
            description: None,
            file_reference: file.map(str::to_string),
            status,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn list_links_each_item() {
        let screen = list(&[item(InboxStatus::New, None)], &WorkflowSettings::default());
        assert_eq!(screen.callbacks(), vec!["inbox:open:9", "nav:home"]);
        assert!(screen.text.contains("Drawing &lt;rev 2&gt;"));
        assert!(screen.text.contains("06.03 12:00"));
    }

    #[test]
    fn detail_offers_processing_until_done() {
        let settings = WorkflowSettings::default();
        let open = detail(Surface::Pm, &item(InboxStatus::Read, Some("https://x/f.pdf")), &settings);
        assert_eq!(open.callbacks(), vec!["inbox:done:9", "pm:inbox", "nav:home"]);
        assert_eq!(open.keyboard.rows[0][0].text, "📎 Open file");

        let done = detail(Surface::Pm, &item(InboxStatus::Processed, Some("telegram:abc")), &settings);
        assert_eq!(done.callbacks(), vec!["pm:inbox", "nav:home"]);
        assert!(done.text.contains("telegram:abc"));
    }
}
