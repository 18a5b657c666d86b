// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Photo report: a typed batch of up to five photos for one floor, with an
//! optional caption. Sent to the pm and pto and kept on the floor.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sitebot_core::SiteError;
use sitebot_core::records::{PHOTO_RECIPIENTS, PhotoSubmission, PhotoType};
use sitebot_core::types::Keyboard;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use super::{
    Advance, Answer, Choice, Flow, FlowContext, FlowCx, Input, Prompt, floor_number, required,
    unexpected,
};
use crate::render::Screen;
use crate::screens::common::{SEP, escape, home_button};

const TITLE: &str = "📷 Photo report";
pub const MAX_PHOTOS: usize = 5;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PhotoStep {
    Project,
    Kind,
    Facade,
    Floor,
    Files,
    Caption,
    Confirm,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoDraft {
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub photo_type: Option<PhotoType>,
    /// Cleared together with the floor when a new project is picked.
    pub facade_id: Option<String>,
    pub facade_name: Option<String>,
    pub floor_id: Option<String>,
    pub floor_number: Option<i32>,
    /// Platform file ids in arrival order.
    pub files: Vec<String>,
    pub caption: Option<String>,
    /// The "received n/5" notice currently in the chat.
    pub notice_message_id: Option<i64>,
}

pub struct PhotoFlow;

fn place_of(draft: &PhotoDraft) -> String {
    format!(
        "{} · floor {}",
        draft.facade_name.as_deref().unwrap_or(""),
        draft
            .floor_number
            .map(|n| n.to_string())
            .unwrap_or_default()
    )
}

#[async_trait]
impl Flow for PhotoFlow {
    type Step = PhotoStep;
    type Draft = PhotoDraft;

    fn first(&self) -> PhotoStep {
        PhotoStep::Project
    }

    async fn prompt(
        &self,
        cx: &FlowCx<'_>,
        step: PhotoStep,
        draft: &PhotoDraft,
    ) -> Result<Prompt, SiteError> {
        let project = draft.project_name.as_deref().unwrap_or("");
        let kind = draft.photo_type.map(PhotoType::label).unwrap_or("");
        let place = place_of(draft);
        Ok(match step {
            PhotoStep::Project => Prompt::new(
                TITLE,
                "Choose a project:",
                Input::Choice(cx.project_choices().await?),
            )
            .auto_pick(),
            PhotoStep::Kind => {
                let choices = PhotoType::iter()
                    .map(|t| Choice::new(t.to_string(), t.label()))
                    .collect();
                Prompt::new(TITLE, "What do the photos show?", Input::Choice(choices))
                    .line("Project", project)
                    .columns(2)
            }
            PhotoStep::Facade => {
                let project_id = required(draft.project_id.as_deref(), "project")?;
                let choices = cx.facade_choices(project_id).await?;
                Prompt::new(TITLE, "Choose a facade:", Input::Choice(choices))
                    .line("Project", project)
                    .line("Type", kind)
                    .columns(2)
            }
            PhotoStep::Floor => {
                let facade_id = required(draft.facade_id.as_deref(), "facade")?;
                let choices = cx.floor_choices(facade_id).await?;
                Prompt::new(TITLE, "Choose a floor:", Input::Choice(choices))
                    .line("Project", project)
                    .line("Type", kind)
                    .line("Facade", draft.facade_name.as_deref().unwrap_or(""))
                    .columns(4)
            }
            PhotoStep::Files => Prompt::new(
                TITLE,
                format!("Send up to {MAX_PHOTOS} photos, then press Done."),
                Input::Files {
                    received: draft.files.len(),
                    limit: MAX_PHOTOS,
                    skippable: false,
                },
            )
            .line("Project", project)
            .line("Type", kind)
            .line("Where", &place),
            PhotoStep::Caption => Prompt::new(
                TITLE,
                "Add a caption, or skip.",
                Input::Text {
                    skippable: true,
                    suggestions: Vec::new(),
                },
            )
            .line("Project", project)
            .line("Where", &place)
            .line("Photos", draft.files.len()),
            PhotoStep::Confirm => Prompt::new(TITLE, "Send this photo report?", Input::Confirm)
                .line("Project", project)
                .line("Type", kind)
                .line("Where", &place)
                .line("Photos", draft.files.len())
                .line("Caption", draft.caption.as_deref().unwrap_or("-")),
        })
    }

    fn accept(&self, step: PhotoStep, draft: &mut PhotoDraft, answer: Answer) -> Advance<PhotoStep> {
        match (step, answer) {
            (PhotoStep::Project, Answer::Picked(choice)) => {
                *draft = PhotoDraft {
                    project_id: Some(choice.value),
                    project_name: Some(choice.label),
                    ..Default::default()
                };
                Advance::To(PhotoStep::Kind)
            }
            (PhotoStep::Kind, Answer::Picked(choice)) => match choice.value.parse() {
                Ok(photo_type) => {
                    draft.photo_type = Some(photo_type);
                    Advance::To(PhotoStep::Facade)
                }
                Err(_) => Advance::Invalid("Pick one of the listed photo types.".to_string()),
            },
            (PhotoStep::Facade, Answer::Picked(choice)) => {
                draft.facade_id = Some(choice.value);
                draft.facade_name = Some(choice.label);
                draft.floor_id = None;
                draft.floor_number = None;
                Advance::To(PhotoStep::Floor)
            }
            (PhotoStep::Floor, Answer::Picked(choice)) => {
                draft.floor_number = floor_number(&choice.label);
                draft.floor_id = Some(choice.value);
                Advance::To(PhotoStep::Files)
            }
            (PhotoStep::Files, Answer::File(reference)) => {
                draft.files.push(reference);
                if draft.files.len() >= MAX_PHOTOS {
                    Advance::To(PhotoStep::Caption)
                } else {
                    Advance::Stay
                }
            }
            (PhotoStep::Files, Answer::Done) => Advance::To(PhotoStep::Caption),
            (PhotoStep::Caption, Answer::Text(text)) => {
                if text.is_empty() {
                    return Advance::Invalid("Type a caption or press Skip.".to_string());
                }
                draft.caption = Some(text);
                Advance::To(PhotoStep::Confirm)
            }
            (PhotoStep::Caption, Answer::Skip) => {
                draft.caption = None;
                Advance::To(PhotoStep::Confirm)
            }
            (PhotoStep::Confirm, Answer::Confirm) => Advance::Commit,
            (step, answer) => unexpected(step, &answer),
        }
    }

    async fn commit(&self, cx: &FlowCx<'_>, draft: &PhotoDraft) -> Result<Screen, SiteError> {
        let batch = PhotoSubmission {
            project_id: required(draft.project_id.as_ref(), "project")?.clone(),
            photo_type: *required(draft.photo_type.as_ref(), "photo type")?,
            facade_id: required(draft.facade_id.as_ref(), "facade")?.clone(),
            floor_id: required(draft.floor_id.as_ref(), "floor")?.clone(),
            file_references: draft.files.clone(),
            caption: draft.caption.clone(),
            recipients: PHOTO_RECIPIENTS.to_vec(),
            submitter: cx.submitter(),
        };
        cx.store.submit_photos(&batch, cx.now).await?;
        let text = format!(
            "<b>✅ Photo report sent</b>\n{SEP}\n{} · {}\n{} · {} photo(s)\nTo: pm, pto",
            escape(draft.project_name.as_deref().unwrap_or(&batch.project_id)),
            batch.photo_type.label(),
            escape(&place_of(draft)),
            batch.file_references.len()
        );
        Ok(Screen::new(text, Keyboard::new().button(home_button())))
    }

    fn pack(&self, step: PhotoStep, draft: PhotoDraft) -> FlowContext {
        FlowContext::Photo { step, draft }
    }

    fn notice(&self, draft: &PhotoDraft) -> Option<String> {
        Some(format!("📷 Received {}/{MAX_PHOTOS}", draft.files.len()))
    }

    fn notice_slot<'d>(&self, draft: &'d mut PhotoDraft) -> Option<&'d mut Option<i64>> {
        Some(&mut draft.notice_message_id)
    }
}
