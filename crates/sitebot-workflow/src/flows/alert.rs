// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raise a site alert for the director and the project manager.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sitebot_core::SiteError;
use sitebot_core::records::{ALERT_RECIPIENTS, AlertSubmission};
use sitebot_core::types::{Keyboard, Priority};
use strum::{Display, EnumIter, EnumString};

use super::{
    Advance, Answer, Choice, Flow, FlowContext, FlowCx, Input, Prompt, min_chars, required,
    unexpected,
};
use crate::render::Screen;
use crate::screens::common::{SEP, escape, home_button};

const TITLE: &str = "⚠️ Raise alert";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertStep {
    Project,
    Priority,
    Title,
    Description,
    Confirm,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertDraft {
    pub project_id: Option<String>,
    /// Shown in later prompts; the commit only needs the id.
    pub project_name: Option<String>,
    pub priority: Option<Priority>,
    /// One-line summary, at least 5 characters.
    pub title: Option<String>,
    /// `None` when the sender skipped the details step.
    pub description: Option<String>,
}

pub struct AlertFlow;

#[async_trait]
impl Flow for AlertFlow {
    type Step = AlertStep;
    type Draft = AlertDraft;

    fn first(&self) -> AlertStep {
        AlertStep::Project
    }

    async fn prompt(
        &self,
        cx: &FlowCx<'_>,
        step: AlertStep,
        draft: &AlertDraft,
    ) -> Result<Prompt, SiteError> {
        let project = draft.project_name.as_deref().unwrap_or("");
        let priority = draft
            .priority
            .map(|p| format!("{} {p}", p.icon()))
            .unwrap_or_default();
        Ok(match step {
            AlertStep::Project => Prompt::new(
                TITLE,
                "Choose a project:",
                Input::Choice(cx.project_choices().await?),
            )
            .auto_pick(),
            AlertStep::Priority => {
                let choices = [
                    Priority::Critical,
                    Priority::High,
                    Priority::Normal,
                    Priority::Low,
                ]
                .into_iter()
                .map(|p| Choice::new(p.to_string(), format!("{} {p}", p.icon())))
                .collect();
                Prompt::new(TITLE, "How urgent is it?", Input::Choice(choices))
                    .line("Project", project)
                    .columns(2)
            }
            AlertStep::Title => Prompt::new(
                TITLE,
                "Describe the problem in one line.",
                Input::Text {
                    skippable: false,
                    suggestions: Vec::new(),
                },
            )
            .line("Project", project)
            .line("Priority", &priority),
            AlertStep::Description => Prompt::new(
                TITLE,
                "Add details, or skip.",
                Input::Text {
                    skippable: true,
                    suggestions: Vec::new(),
                },
            )
            .line("Project", project)
            .line("Priority", &priority),
            AlertStep::Confirm => Prompt::new(TITLE, "Raise this alert?", Input::Confirm)
                .line("Project", project)
                .line("Priority", &priority)
                .line("Title", draft.title.as_deref().unwrap_or(""))
                .line("Details", draft.description.as_deref().unwrap_or("-")),
        })
    }

    fn accept(&self, step: AlertStep, draft: &mut AlertDraft, answer: Answer) -> Advance<AlertStep> {
        match (step, answer) {
            (AlertStep::Project, Answer::Picked(choice)) => {
                draft.project_id = Some(choice.value);
                draft.project_name = Some(choice.label);
                Advance::To(AlertStep::Priority)
            }
            (AlertStep::Priority, Answer::Picked(choice)) => match choice.value.parse() {
                Ok(priority) => {
                    draft.priority = Some(priority);
                    Advance::To(AlertStep::Title)
                }
                Err(_) => Advance::Invalid(super::OPTION_GONE.to_string()),
            },
            (AlertStep::Title, Answer::Text(text)) => {
                match min_chars(&text, 5, "The title needs at least 5 characters.") {
                    Ok(title) => {
                        draft.title = Some(title);
                        Advance::To(AlertStep::Description)
                    }
                    Err(message) => Advance::Invalid(message),
                }
            }
            (AlertStep::Description, Answer::Text(text)) => {
                if text.is_empty() {
                    return Advance::Invalid("Type the details or press Skip.".to_string());
                }
                draft.description = Some(text);
                Advance::To(AlertStep::Confirm)
            }
            (AlertStep::Description, Answer::Skip) => {
                draft.description = None;
                Advance::To(AlertStep::Confirm)
            }
            (AlertStep::Confirm, Answer::Confirm) => Advance::Commit,
            (step, answer) => unexpected(step, &answer),
        }
    }

    async fn commit(&self, cx: &FlowCx<'_>, draft: &AlertDraft) -> Result<Screen, SiteError> {
        let alert = AlertSubmission {
            project_id: required(draft.project_id.as_ref(), "project")?.clone(),
            priority: *required(draft.priority.as_ref(), "priority")?,
            title: required(draft.title.as_ref(), "title")?.clone(),
            description: draft.description.clone(),
            recipients: ALERT_RECIPIENTS.to_vec(),
            submitter: cx.submitter(),
        };
        let id = cx.store.submit_alert(&alert, cx.now).await?;
        tracing::info!(alert_id = id, priority = %alert.priority, "alert raised");
        let text = format!(
            "<b>✅ Alert raised</b>\n{SEP}\n{} {}\n{}\nThe director and the project manager were notified.",
            alert.priority.icon(),
            escape(&alert.title),
            escape(draft.project_name.as_deref().unwrap_or(&alert.project_id))
        );
        Ok(Screen::new(text, Keyboard::new().button(home_button())))
    }

    fn pack(&self, step: AlertStep, draft: AlertDraft) -> FlowContext {
        FlowContext::Alert { step, draft }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_and_title() {
        let flow = AlertFlow;
        let mut draft = AlertDraft::default();
        assert_eq!(
            flow.accept(
                AlertStep::Priority,
                &mut draft,
                Answer::Picked(Choice::new("critical", "🔴 critical"))
            ),
            Advance::To(AlertStep::Title)
        );
        assert_eq!(draft.priority, Some(Priority::Critical));
        assert!(matches!(
            flow.accept(AlertStep::Title, &mut draft, Answer::Text("leak".into())),
            Advance::Invalid(_)
        ));
        assert_eq!(
            flow.accept(AlertStep::Title, &mut draft, Answer::Text("Water leak".into())),
            Advance::To(AlertStep::Description)
        );
    }
}
