// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily work log. Submitting it opens a level-1 approval for the project manager.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sitebot_core::SiteError;
use sitebot_core::records::DailyLogSubmission;
use sitebot_core::types::Keyboard;
use strum::{Display, EnumIter, EnumString};

use super::{
    Advance, Answer, Flow, FlowContext, FlowCx, Input, Prompt, min_chars, required, unexpected,
};
use crate::render::Screen;
use crate::screens::common::{SEP, escape, home_button};

const TITLE: &str = "📝 Daily log";
const MAX_WORKERS: u32 = 500;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DailyLogStep {
    Project,
    Zone,
    Works,
    Volume,
    Workers,
    Issues,
    Confirm,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyLogDraft {
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    /// Free-text work zone or section.
    pub zone: Option<String>,
    /// Description of the work done today.
    pub works: Option<String>,
    /// Free-form volume, e.g. "12 modules".
    pub volume: Option<String>,
    /// Headcount on site, 1 to `MAX_WORKERS`.
    pub workers: Option<u32>,
    /// `None` when the day had no issues to report.
    pub issues: Option<String>,
}

pub struct DailyLogFlow;

fn parse_workers(text: &str) -> Result<u32, String> {
    match text.trim().parse::<u32>() {
        Ok(n) if (1..=MAX_WORKERS).contains(&n) => Ok(n),
        _ => Err(format!("Enter the number of workers from 1 to {MAX_WORKERS}.")),
    }
}

fn text_input() -> Input {
    Input::Text {
        skippable: false,
        suggestions: Vec::new(),
    }
}

#[async_trait]
impl Flow for DailyLogFlow {
    type Step = DailyLogStep;
    type Draft = DailyLogDraft;

    fn first(&self) -> DailyLogStep {
        DailyLogStep::Project
    }

    async fn prompt(
        &self,
        cx: &FlowCx<'_>,
        step: DailyLogStep,
        draft: &DailyLogDraft,
    ) -> Result<Prompt, SiteError> {
        let project = draft.project_name.as_deref().unwrap_or("");
        let dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        Ok(match step {
            DailyLogStep::Project => Prompt::new(
                TITLE,
                "Choose a project:",
                Input::Choice(cx.project_choices().await?),
            )
            .auto_pick(),
            DailyLogStep::Zone => {
                Prompt::new(TITLE, "Which zone or section?", text_input()).line("Project", project)
            }
            DailyLogStep::Works => Prompt::new(TITLE, "What work was done today?", text_input())
                .line("Project", project)
                .line("Zone", dash(&draft.zone)),
            DailyLogStep::Volume => Prompt::new(
                TITLE,
                "What volume was completed (with units)?",
                text_input(),
            )
            .line("Project", project)
            .line("Zone", dash(&draft.zone)),
            DailyLogStep::Workers => Prompt::new(
                TITLE,
                "How many workers were on site?",
                Input::Text {
                    skippable: false,
                    suggestions: ["5", "10", "15", "20"].map(String::from).to_vec(),
                },
            )
            .line("Project", project)
            .line("Zone", dash(&draft.zone)),
            DailyLogStep::Issues => Prompt::new(
                TITLE,
                "Any issues or delays? Type them or skip.",
                Input::Text {
                    skippable: true,
                    suggestions: Vec::new(),
                },
            )
            .line("Project", project)
            .line("Zone", dash(&draft.zone)),
            DailyLogStep::Confirm => Prompt::new(TITLE, "Submit this log for approval?", Input::Confirm)
                .line("Project", project)
                .line("Date", cx.today().format("%d.%m.%Y"))
                .line("Zone", dash(&draft.zone))
                .line("Works", dash(&draft.works))
                .line("Volume", dash(&draft.volume))
                .line(
                    "Workers",
                    draft.workers.map(|n| n.to_string()).unwrap_or_default(),
                )
                .line("Issues", dash(&draft.issues)),
        })
    }

    fn accept(
        &self,
        step: DailyLogStep,
        draft: &mut DailyLogDraft,
        answer: Answer,
    ) -> Advance<DailyLogStep> {
        fn store_text(
            slot: &mut Option<String>,
            text: &str,
            min: usize,
            message: &str,
            next: DailyLogStep,
        ) -> Advance<DailyLogStep> {
            match min_chars(text, min, message) {
                Ok(text) => {
                    *slot = Some(text);
                    Advance::To(next)
                }
                Err(message) => Advance::Invalid(message),
            }
        }

        match (step, answer) {
            (DailyLogStep::Project, Answer::Picked(choice)) => {
                draft.project_id = Some(choice.value);
                draft.project_name = Some(choice.label);
                Advance::To(DailyLogStep::Zone)
            }
            (DailyLogStep::Zone, Answer::Text(text)) => store_text(
                &mut draft.zone,
                &text,
                2,
                "The zone needs at least 2 characters.",
                DailyLogStep::Works,
            ),
            (DailyLogStep::Works, Answer::Text(text)) => store_text(
                &mut draft.works,
                &text,
                5,
                "Describe the work in at least 5 characters.",
                DailyLogStep::Volume,
            ),
            (DailyLogStep::Volume, Answer::Text(text)) => store_text(
                &mut draft.volume,
                &text,
                1,
                "Enter the completed volume.",
                DailyLogStep::Workers,
            ),
            (DailyLogStep::Workers, Answer::Text(text)) => match parse_workers(&text) {
                Ok(n) => {
                    draft.workers = Some(n);
                    Advance::To(DailyLogStep::Issues)
                }
                Err(message) => Advance::Invalid(message),
            },
            (DailyLogStep::Issues, Answer::Text(text)) => store_text(
                &mut draft.issues,
                &text,
                1,
                "Type the issues or press Skip.",
                DailyLogStep::Confirm,
            ),
            (DailyLogStep::Issues, Answer::Skip) => {
                draft.issues = None;
                Advance::To(DailyLogStep::Confirm)
            }
            (DailyLogStep::Confirm, Answer::Confirm) => Advance::Commit,
            (step, answer) => unexpected(step, &answer),
        }
    }

    async fn commit(&self, cx: &FlowCx<'_>, draft: &DailyLogDraft) -> Result<Screen, SiteError> {
        let log = DailyLogSubmission {
            project_id: required(draft.project_id.as_ref(), "project")?.clone(),
            log_date: cx.today(),
            zone: required(draft.zone.as_ref(), "zone")?.clone(),
            works: required(draft.works.as_ref(), "works")?.clone(),
            volume: required(draft.volume.as_ref(), "volume")?.clone(),
            workers: *required(draft.workers.as_ref(), "workers")?,
            issues: draft.issues.clone(),
            submitter: cx.submitter(),
        };
        let id = cx.store.submit_daily_log(&log, cx.now).await?;
        tracing::info!(daily_log_id = id, "daily log submitted for approval");
        let text = format!(
            "<b>✅ Daily log submitted</b>\n{SEP}\n{} · {}\nSent to the project manager for approval.",
            escape(draft.project_name.as_deref().unwrap_or(&log.project_id)),
            log.log_date.format("%d.%m.%Y")
        );
        Ok(Screen::new(text, Keyboard::new().button(home_button())))
    }

    fn pack(&self, step: DailyLogStep, draft: DailyLogDraft) -> FlowContext {
        FlowContext::DailyLog { step, draft }
    }
}
