// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use sitebot_core::types::{InlineButton, Keyboard};

use crate::render::Screen;
use crate::roles::{MenuAction, Surface};
use crate::screens::common::{SEP, escape};

/// The role menu. `unread` is shown on the inbox button; `hint` above the buttons.
pub fn menu(surface: Surface, display_name: &str, unread: i64, hint: Option<&str>) -> Screen {
    let mut text = format!(
        "<b>{}</b>\n{SEP}\nHello, {}.",
        surface.title(),
        escape(display_name)
    );
    if unread > 0 {
        text.push_str(&format!("\n📥 Unread in inbox: <b>{unread}</b>"));
    }
    if let Some(hint) = hint {
        text.push_str(&format!("\n\n<i>{}</i>", escape(hint)));
    }

    let buttons: Vec<InlineButton> = surface
        .menu()
        .iter()
        .map(|action| {
            let label = match action {
                MenuAction::Inbox if unread > 0 => format!("{} ({unread})", action.label()),
                _ => action.label().to_string(),
            };
            InlineButton::callback(label, action.token(surface))
        })
        .collect();

    let mut keyboard = Keyboard::new();
    for pair in buttons.chunks(2) {
        keyboard = keyboard.row(pair.to_vec());
    }
    Screen::new(text, keyboard)
}
