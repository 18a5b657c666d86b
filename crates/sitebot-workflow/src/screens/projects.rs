// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use sitebot_core::records::{Project, ProjectProgress};
use sitebot_core::types::{InlineButton, Keyboard};

use crate::callback;
use crate::render::Screen;
use crate::roles::{MenuAction, Surface};
use crate::screens::common::{SEP, back_button, escape, home_button, progress_bar};

/// One page of the active projects. Pages are zero-based and clamped.
pub fn list(projects: &[Project], page: usize, page_size: usize) -> Screen {
    let page_size = page_size.max(1);
    let pages = projects.len().div_ceil(page_size).max(1);
    let page = page.min(pages - 1);

    let mut text = format!("<b>🏗 Active projects</b>\n{SEP}\n");
    if projects.is_empty() {
        text.push_str("No active projects.");
    } else {
        text.push_str(&format!("Page {} of {pages}", page + 1));
    }

    let mut keyboard = Keyboard::new();
    for project in projects.iter().skip(page * page_size).take(page_size) {
        let label = match &project.code {
            Some(code) => format!("{code} · {}", project.name),
            None => project.name.clone(),
        };
        keyboard = keyboard.button(InlineButton::callback(
            label,
            callback::token("proj", "view", Some(&project.id)),
        ));
    }

    let mut nav = Vec::new();
    if page > 0 {
        nav.push(InlineButton::callback(
            "⬅️",
            callback::token("proj", "page", Some(&(page - 1).to_string())),
        ));
    }
    if page + 1 < pages {
        nav.push(InlineButton::callback(
            "➡️",
            callback::token("proj", "page", Some(&(page + 1).to_string())),
        ));
    }
    Screen::new(text, keyboard.row(nav).button(home_button()))
}

pub fn detail(surface: Surface, progress: &ProjectProgress) -> Screen {
    let project = &progress.project;
    let mut text = format!("<b>🏗 {}</b>\n{SEP}\n", escape(&project.name));
    if let Some(code) = &project.code {
        text.push_str(&format!("Code: {}\n", escape(code)));
    }
    text.push_str(&format!(
        "Modules: <b>{} / {}</b>\n{}\nOpen alerts: {}\nOpen tasks: {}",
        progress.modules_fact,
        progress.modules_plan,
        progress_bar(progress.percent()),
        progress.open_alerts,
        progress.open_tasks
    ));
    if let Some(end) = project.end_date {
        text.push_str(&format!("\nDeadline: {}", end.format("%d.%m.%Y")));
    }
    Screen::new(
        text,
        Keyboard::new().row(vec![back_button(surface, MenuAction::Projects), home_button()]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(n: usize) -> Project {
        Project {
            id: format!("p{n}"),
            name: format!("Tower {n}"),
            code: None,
            status: "active".into(),
            end_date: None,
        }
    }

    #[test]
    fn pagination_clamps_and_links() {
        let projects: Vec<Project> = (1..=7).map(project).collect();
        let first = list(&projects, 0, 5);
        assert_eq!(first.callbacks().len(), 5 + 1 + 1);
        assert!(first.callbacks().contains(&"proj:page:1"));
        assert!(!first.callbacks().contains(&"proj:page:0"));

        let last = list(&projects, 9, 5);
        assert!(last.text.contains("Page 2 of 2"));
        assert_eq!(last.callbacks(), vec!["proj:view:p6", "proj:view:p7", "proj:page:0", "nav:home"]);
    }

    #[test]
    fn detail_shows_progress() {
        let progress = ProjectProgress {
            project: project(1),
            modules_plan: 200,
            modules_fact: 50,
            open_alerts: 1,
            open_tasks: 4,
        };
        let screen = detail(Surface::Director, &progress);
        assert!(screen.text.contains("50 / 200"));
        assert!(screen.text.contains("25%"));
        assert_eq!(screen.callbacks(), vec!["d:projects", "nav:home"]);
    }
}
