// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Foreman progress report: modules installed on one floor today.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sitebot_core::SiteError;
use sitebot_core::records::{FloorStatus, ReportSubmission};
use sitebot_core::types::{InlineButton, Keyboard};
use strum::{Display, EnumIter, EnumString};

use super::{
    Advance, Answer, Flow, FlowContext, FlowCx, Input, Prompt, floor_number, required, unexpected,
};
use crate::render::Screen;
use crate::roles::{MenuAction, Surface};
use crate::screens::common::{SEP, escape, home_button, progress_bar};

const TITLE: &str = "📊 Progress report";
const MAX_VALUE: i64 = 1000;
const SUGGESTIONS: [i64; 8] = [5, 10, 15, 20, 25, 30, 40, 50];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportStep {
    Project,
    Facade,
    Floor,
    Value,
    Confirm,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportDraft {
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub facade_id: Option<String>,
    pub facade_name: Option<String>,
    pub floor_id: Option<String>,
    pub floor_number: Option<i32>,
    /// Modules mounted since the last report.
    pub value: Option<i64>,
}

pub struct ReportFlow;

fn parse_value(text: &str) -> Result<i64, String> {
    match text.trim().parse::<i64>() {
        Ok(v) if (1..=MAX_VALUE).contains(&v) => Ok(v),
        _ => Err(format!("Enter a whole number of modules from 1 to {MAX_VALUE}.")),
    }
}

#[async_trait]
impl Flow for ReportFlow {
    type Step = ReportStep;
    type Draft = ReportDraft;

    fn first(&self) -> ReportStep {
        ReportStep::Project
    }

    async fn prompt(
        &self,
        cx: &FlowCx<'_>,
        step: ReportStep,
        draft: &ReportDraft,
    ) -> Result<Prompt, SiteError> {
        let project = draft.project_name.as_deref().unwrap_or("");
        let facade = draft.facade_name.as_deref().unwrap_or("");
        Ok(match step {
            ReportStep::Project => Prompt::new(
                TITLE,
                "Choose a project:",
                Input::Choice(cx.project_choices().await?),
            )
            .auto_pick(),
            ReportStep::Facade => {
                let project_id = required(draft.project_id.as_deref(), "project")?;
                let choices = cx.facade_choices(project_id).await?;
                Prompt::new(TITLE, "Choose a facade:", Input::Choice(choices))
                    .line("Project", project)
                    .columns(2)
            }
            ReportStep::Floor => {
                let facade_id = required(draft.facade_id.as_deref(), "facade")?;
                let choices = cx.floor_choices(facade_id).await?;
                Prompt::new(TITLE, "Choose a floor:", Input::Choice(choices))
                    .line("Project", project)
                    .line("Facade", facade)
                    .columns(4)
            }
            ReportStep::Value => {
                let floor_id = required(draft.floor_id.as_deref(), "floor")?;
                let floor = cx
                    .store
                    .get_floor(floor_id)
                    .await?
                    .ok_or_else(|| SiteError::not_found("floor", floor_id))?;
                Prompt::new(
                    TITLE,
                    "How many modules were installed today?",
                    Input::Text {
                        skippable: false,
                        suggestions: SUGGESTIONS.iter().map(i64::to_string).collect(),
                    },
                )
                .line("Project", project)
                .line("Facade", facade)
                .line("Floor", floor.floor_number)
                .line("Plan", floor.modules_plan)
                .line("Fact", floor.modules_fact)
                .line(
                    "Remaining",
                    (floor.modules_plan - floor.modules_fact).max(0),
                )
            }
            ReportStep::Confirm => {
                let floor = draft
                    .floor_number
                    .map(|n| n.to_string())
                    .unwrap_or_default();
                let value = draft.value.map(|v| format!("+{v}")).unwrap_or_default();
                Prompt::new(TITLE, "Save this report?", Input::Confirm)
                    .line("Project", project)
                    .line("Facade", facade)
                    .line("Floor", floor)
                    .line("Modules", value)
            }
        })
    }

    fn accept(
        &self,
        step: ReportStep,
        draft: &mut ReportDraft,
        answer: Answer,
    ) -> Advance<ReportStep> {
        match (step, answer) {
            (ReportStep::Project, Answer::Picked(choice)) => {
                *draft = ReportDraft {
                    project_id: Some(choice.value),
                    project_name: Some(choice.label),
                    ..Default::default()
                };
                Advance::To(ReportStep::Facade)
            }
            (ReportStep::Facade, Answer::Picked(choice)) => {
                draft.facade_id = Some(choice.value);
                draft.facade_name = Some(choice.label);
                draft.floor_id = None;
                draft.floor_number = None;
                Advance::To(ReportStep::Floor)
            }
            (ReportStep::Floor, Answer::Picked(choice)) => {
                draft.floor_number = floor_number(&choice.label);
                draft.floor_id = Some(choice.value);
                Advance::To(ReportStep::Value)
            }
            (ReportStep::Value, Answer::Text(text)) => match parse_value(&text) {
                Ok(value) => {
                    draft.value = Some(value);
                    Advance::To(ReportStep::Confirm)
                }
                Err(message) => Advance::Invalid(message),
            },
            (ReportStep::Confirm, Answer::Confirm) => Advance::Commit,
            (step, answer) => unexpected(step, &answer),
        }
    }

    async fn commit(&self, cx: &FlowCx<'_>, draft: &ReportDraft) -> Result<Screen, SiteError> {
        let report = ReportSubmission {
            project_id: required(draft.project_id.as_ref(), "project")?.clone(),
            facade_id: required(draft.facade_id.as_ref(), "facade")?.clone(),
            floor_id: required(draft.floor_id.as_ref(), "floor")?.clone(),
            value: *required(draft.value.as_ref(), "value")?,
            report_date: cx.today(),
            submitter: cx.submitter(),
        };
        let progress = cx.store.submit_report(&report, cx.now).await?;
        let floor = &progress.floor;
        let percent = if floor.modules_plan > 0 {
            (floor.modules_fact.saturating_mul(100) / floor.modules_plan).clamp(0, 100) as u8
        } else {
            0
        };

        let mut text = format!(
            "<b>✅ Report saved</b>\n{SEP}\nProject: {}\nFacade: {}\nFloor: <b>{}</b>\n\
             Added: <b>+{}</b>\nFloor total: <b>{} / {}</b>\n{}",
            escape(draft.project_name.as_deref().unwrap_or(&report.project_id)),
            escape(draft.facade_name.as_deref().unwrap_or(&report.facade_id)),
            floor.floor_number,
            report.value,
            floor.modules_fact,
            floor.modules_plan,
            progress_bar(percent)
        );
        if floor.status == FloorStatus::Done {
            text.push_str("\n🎉 Floor complete!");
        }
        let surface = Surface::of(cx.role);
        let keyboard = Keyboard::new().row(vec![
            InlineButton::callback("📊 Another report", MenuAction::Report.token(surface)),
            home_button(),
        ]);
        Ok(Screen::new(text, keyboard))
    }

    fn pack(&self, step: ReportStep, draft: ReportDraft) -> FlowContext {
        FlowContext::Report { step, draft }
    }
}
