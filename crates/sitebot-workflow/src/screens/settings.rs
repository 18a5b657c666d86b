// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use sitebot_core::types::{InlineButton, Keyboard, NotificationPreferences, PreferenceKey};
use strum::IntoEnumIterator;

use crate::render::Screen;
use crate::roles::{MenuAction, Surface};
use crate::screens::common::{SEP, home_button};

/// Notification switches, one toggle button each.
pub fn notifications(surface: Surface, preferences: &NotificationPreferences) -> Screen {
    let mut text = format!("<b>⚙️ Notifications</b>\n{SEP}\n");
    let mut keyboard = Keyboard::new();
    for key in PreferenceKey::iter() {
        let mark = if preferences.get(key) { "🔔" } else { "🔕" };
        text.push_str(&format!("{mark} {}\n", key.label()));
        keyboard = keyboard.button(InlineButton::callback(
            format!("{mark} {}", key.label()),
            format!("{}:{key}", MenuAction::Notif.token(surface)),
        ));
    }
    Screen::new(text, keyboard.button(home_button()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles_carry_the_key() {
        let mut prefs = NotificationPreferences::default();
        prefs.daily_digest = false;
        let screen = notifications(Surface::Foreman, &prefs);
        assert_eq!(
            screen.callbacks(),
            vec![
                "f:notif:report_reminders",
                "f:notif:deadline_warnings",
                "f:notif:daily_digest",
                "f:notif:alert_notifications",
                "nav:home"
            ]
        );
        assert!(screen.text.contains("🔕 Daily digest"));
    }
}
