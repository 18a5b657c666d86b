// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Send a document to one or more departments.
//!
//! The offered document types come from the sender's role catalogue. Picking
//! a type preselects its usual recipients, which the sender may still change.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sitebot_core::records::{DocumentSubmission, document_catalogue, document_kind};
use sitebot_core::types::Keyboard;
use sitebot_core::{Role, SiteError};
use strum::{Display, EnumIter, EnumString};

use super::{
    Advance, Answer, Choice, Flow, FlowContext, FlowCx, Input, Prompt, min_chars, required,
    unexpected,
};
use crate::render::Screen;
use crate::roles::Surface;
use crate::screens::common::{SEP, escape, home_button};

const TITLE: &str = "📤 Send document";

/// Departments a document can be addressed to, one role per menu surface.
const DESTINATIONS: [Role; 8] = [
    Role::Pm,
    Role::Director,
    Role::Project,
    Role::Supply,
    Role::Production,
    Role::Pto,
    Role::Inspector,
    Role::Foreman1,
];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentStep {
    Project,
    Type,
    Recipients,
    File,
    Comment,
    Confirm,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentDraft {
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    /// Catalogue key of the chosen type.
    pub doc_type: Option<String>,
    pub doc_label: Option<String>,
    /// Starts as the type's default recipients.
    pub recipients: Vec<Role>,
    pub file_reference: Option<String>,
    pub comment: Option<String>,
}

pub struct DocumentFlow;

fn destinations_for(sender: Role) -> impl Iterator<Item = Role> {
    let own = Surface::of(sender);
    DESTINATIONS
        .into_iter()
        .filter(move |r| Surface::of(*r) != own)
}

/// Recipient options: the chosen type's defaults, then the other departments.
fn recipient_options(sender: Role, doc_type: Option<&str>) -> Vec<Role> {
    let mut options: Vec<Role> = doc_type
        .and_then(document_kind)
        .map(|kind| kind.recipients.to_vec())
        .unwrap_or_default();
    for role in destinations_for(sender) {
        if !options.contains(&role) {
            options.push(role);
        }
    }
    options
}

fn recipient_list(recipients: &[Role]) -> String {
    recipients
        .iter()
        .map(|r| r.label())
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl Flow for DocumentFlow {
    type Step = DocumentStep;
    type Draft = DocumentDraft;

    fn first(&self) -> DocumentStep {
        DocumentStep::Project
    }

    async fn prompt(
        &self,
        cx: &FlowCx<'_>,
        step: DocumentStep,
        draft: &DocumentDraft,
    ) -> Result<Prompt, SiteError> {
        let project = draft.project_name.as_deref().unwrap_or("");
        let doc_type = draft.doc_label.as_deref().unwrap_or("");
        Ok(match step {
            DocumentStep::Project => Prompt::new(
                TITLE,
                "Choose a project:",
                Input::Choice(cx.project_choices().await?),
            )
            .auto_pick(),
            DocumentStep::Type => {
                let catalogue = document_catalogue(cx.role);
                if catalogue.is_empty() {
                    return Err(SiteError::Forbidden(format!(
                        "role {} has no document types",
                        cx.role
                    )));
                }
                let choices = catalogue
                    .iter()
                    .map(|kind| Choice::new(kind.key, kind.label))
                    .collect();
                Prompt::new(TITLE, "What kind of document is it?", Input::Choice(choices))
                    .line("Project", project)
            }
            DocumentStep::Recipients => {
                let options = recipient_options(cx.role, draft.doc_type.as_deref())
                    .into_iter()
                    .map(|r| Choice::new(r.to_string(), r.label()))
                    .collect();
                Prompt::new(
                    TITLE,
                    "Who should receive it? Select one or more, then press Done.",
                    Input::MultiChoice {
                        options,
                        selected: draft.recipients.iter().map(Role::to_string).collect(),
                    },
                )
                .line("Project", project)
                .line("Type", doc_type)
            }
            DocumentStep::File => Prompt::new(
                TITLE,
                "Attach the file, or skip if it was handed over on paper.",
                Input::Files {
                    received: usize::from(draft.file_reference.is_some()),
                    limit: 1,
                    skippable: true,
                },
            )
            .line("Project", project)
            .line("Type", doc_type)
            .line("To", recipient_list(&draft.recipients)),
            DocumentStep::Comment => Prompt::new(
                TITLE,
                "Add a comment for the recipients, or skip.",
                Input::Text {
                    skippable: true,
                    suggestions: Vec::new(),
                },
            )
            .line("Project", project)
            .line("Type", doc_type),
            DocumentStep::Confirm => {
                let file = if draft.file_reference.is_some() { "attached" } else { "none" };
                Prompt::new(TITLE, "Send this document?", Input::Confirm)
                    .line("Project", project)
                    .line("Type", doc_type)
                    .line("To", recipient_list(&draft.recipients))
                    .line("File", file)
                    .line("Comment", draft.comment.as_deref().unwrap_or("-"))
            }
        })
    }

    fn accept(
        &self,
        step: DocumentStep,
        draft: &mut DocumentDraft,
        answer: Answer,
    ) -> Advance<DocumentStep> {
        match (step, answer) {
            (DocumentStep::Project, Answer::Picked(choice)) => {
                draft.project_id = Some(choice.value);
                draft.project_name = Some(choice.label);
                Advance::To(DocumentStep::Type)
            }
            (DocumentStep::Type, Answer::Picked(choice)) => match document_kind(&choice.value) {
                Some(kind) => {
                    draft.doc_type = Some(kind.key.to_string());
                    draft.doc_label = Some(kind.label.to_string());
                    draft.recipients = kind.recipients.to_vec();
                    Advance::To(DocumentStep::Recipients)
                }
                None => Advance::Invalid(super::OPTION_GONE.to_string()),
            },
            (DocumentStep::Recipients, Answer::Toggled(value)) => {
                let Some(role) = Role::parse_tag(&value) else {
                    return Advance::Invalid(super::OPTION_GONE.to_string());
                };
                if let Some(pos) = draft.recipients.iter().position(|r| *r == role) {
                    draft.recipients.remove(pos);
                } else {
                    draft.recipients.push(role);
                }
                Advance::Stay
            }
            (DocumentStep::Recipients, Answer::Done) => Advance::To(DocumentStep::File),
            (DocumentStep::File, Answer::File(reference)) => {
                draft.file_reference = Some(reference);
                Advance::To(DocumentStep::Comment)
            }
            (DocumentStep::File, Answer::Skip | Answer::Done) => Advance::To(DocumentStep::Comment),
            (DocumentStep::Comment, Answer::Text(text)) => {
                match min_chars(&text, 3, "The comment needs at least 3 characters.") {
                    Ok(comment) => {
                        draft.comment = Some(comment);
                        Advance::To(DocumentStep::Confirm)
                    }
                    Err(message) => Advance::Invalid(message),
                }
            }
            (DocumentStep::Comment, Answer::Skip) => {
                draft.comment = None;
                Advance::To(DocumentStep::Confirm)
            }
            (DocumentStep::Confirm, Answer::Confirm) => Advance::Commit,
            (step, answer) => unexpected(step, &answer),
        }
    }

    async fn commit(&self, cx: &FlowCx<'_>, draft: &DocumentDraft) -> Result<Screen, SiteError> {
        let doc_type = required(draft.doc_type.as_ref(), "document type")?.clone();
        let label = draft.doc_label.clone().unwrap_or_else(|| doc_type.clone());
        let doc = DocumentSubmission {
            project_id: required(draft.project_id.as_ref(), "project")?.clone(),
            doc_type,
            label,
            recipients: draft.recipients.clone(),
            file_reference: draft.file_reference.clone(),
            comment: draft.comment.clone(),
            submitter: cx.submitter(),
        };
        let id = cx.store.submit_document(&doc, cx.now).await?;
        tracing::info!(
            document_id = id,
            doc_type = %doc.doc_type,
            recipients = doc.recipients.len(),
            "document sent"
        );

        let text = format!(
            "<b>✅ Document sent</b>\n{SEP}\n{} · {}\nTo: {}",
            escape(&doc.label),
            escape(draft.project_name.as_deref().unwrap_or(&doc.project_id)),
            escape(&recipient_list(&doc.recipients))
        );
        Ok(Screen::new(text, Keyboard::new().button(home_button())))
    }

    fn pack(&self, step: DocumentStep, draft: DocumentDraft) -> FlowContext {
        FlowContext::Document { step, draft }
    }
}
