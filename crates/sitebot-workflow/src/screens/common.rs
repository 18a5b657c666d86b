// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared formatting and the small fixed screens.

use sitebot_core::types::{InlineButton, Keyboard};

use crate::callback::HOME;
use crate::render::Screen;
use crate::roles::{MenuAction, Surface};

pub const SEP: &str = "──────────────";

/// Escape text for HTML parse mode.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Ten-cell bar, e.g. `▓▓▓░░░░░░░ 30%`.
pub fn progress_bar(percent: u8) -> String {
    let percent = percent.min(100);
    let filled = usize::from(percent / 10);
    format!("{}{} {percent}%", "▓".repeat(filled), "░".repeat(10 - filled))
}

/// Cut `text` to `max` characters, marking the cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}

pub fn home_button() -> InlineButton {
    InlineButton::callback("🏠 Menu", HOME)
}

/// A button back to a list on the caller's menu.
pub fn back_button(surface: Surface, action: MenuAction) -> InlineButton {
    InlineButton::callback("◀️ Back", action.token(surface))
}

/// Shown to chats that are not bound to a profile.
pub fn link_account(chat_id: i64, bot_name: &str) -> Screen {
    let text = format!(
        "<b>{}</b>\n{SEP}\nThis chat is not linked to a staff account.\n\n\
         Ask an administrator to link chat id <code>{chat_id}</code> to your profile, \
         then send /start.",
        escape(bot_name)
    );
    Screen::new(text, Keyboard::new())
}

pub fn help(bot_name: &str, surface: Surface) -> Screen {
    let text = format!(
        "<b>{} · Help</b>\n{SEP}\n\
         /start, /menu: open your menu\n\
         /projects: active projects\n\
         /tasks: your tasks\n\
         /settings: notifications\n\
         /report: progress report (foremen)\n\
         /cancel: abandon the current step\n\
         /myid: show this chat's id\n\n\
         Your menu: {}",
        escape(bot_name),
        surface.title()
    );
    Screen::new(text, Keyboard::new().button(home_button()))
}

pub fn my_id(chat_id: i64, user_id: &str) -> Screen {
    Screen::new(
        format!(
            "Chat id: <code>{chat_id}</code>\nUser id: <code>{}</code>",
            escape(user_id)
        ),
        Keyboard::new().button(home_button()),
    )
}

pub fn not_found(what: &str) -> Screen {
    Screen::new(
        format!("🔎 {} was not found. It may have been removed.", escape(what)),
        Keyboard::new().button(home_button()),
    )
}

pub fn denied() -> Screen {
    Screen::new(
        "⛔ This action is not available for your role.",
        Keyboard::new().button(home_button()),
    )
}

pub fn failure() -> Screen {
    Screen::new(
        "❌ Something went wrong. Nothing was saved; please try again.",
        Keyboard::new().button(home_button()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html() {
        assert_eq!(escape("a<b> & \"c\""), "a&lt;b&gt; &amp; &quot;c&quot;");
    }

    #[test]
    fn progress_bar_is_clamped() {
        assert_eq!(progress_bar(0), "░░░░░░░░░░ 0%");
        assert_eq!(progress_bar(45), "▓▓▓▓░░░░░░ 45%");
        assert_eq!(progress_bar(250), "▓▓▓▓▓▓▓▓▓▓ 100%");
    }

    #[test]
    fn truncate_marks_the_cut() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }

    #[test]
    fn link_screen_shows_the_chat_id() {
        let screen = link_account(4242, "Sitebot");
        assert!(screen.text.contains("<code>4242</code>"));
        assert!(screen.keyboard.is_empty());
    }
}
