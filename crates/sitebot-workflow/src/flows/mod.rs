// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Guided multi-step flows.
//!
//! Each flow is a sequence of named steps over a typed draft. A step renders
//! a [`Prompt`], accepts one [`Answer`] and either advances, stays, rejects
//! the input or commits. Nothing is written to the business tables before
//! the confirmation step commits.
//!
//! The persisted session carries the flow as a [`FlowContext`] (JSON) and its
//! step as a [`FlowState`] tag such as `report:floor`.

pub mod alert;
pub mod daily_log;
pub mod document;
pub(crate) mod engine;
pub mod photo;
pub mod report;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sitebot_core::records::{FloorStatus, Submitter};
use sitebot_core::types::{Identity, InlineButton, Keyboard};
use sitebot_core::{Role, SiteError, StorageAdapter};
use strum::{Display, EnumIter, EnumString};

use crate::callback;
use crate::render::Screen;
use crate::screens::common::{SEP, escape};
use crate::settings::WorkflowSettings;

pub use alert::{AlertDraft, AlertFlow, AlertStep};
pub use daily_log::{DailyLogDraft, DailyLogFlow, DailyLogStep};
pub use document::{DocumentDraft, DocumentFlow, DocumentStep};
pub use photo::{PhotoDraft, PhotoFlow, PhotoStep};
pub use report::{ReportDraft, ReportFlow, ReportStep};

/// The five guided flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum FlowKind {
    #[strum(to_string = "doc")]
    Document,
    #[strum(to_string = "photo")]
    Photo,
    #[strum(to_string = "log")]
    DailyLog,
    #[strum(to_string = "alert")]
    Alert,
    #[strum(to_string = "report")]
    Report,
}

/// The step a session is parked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Document(DocumentStep),
    Photo(PhotoStep),
    DailyLog(DailyLogStep),
    Alert(AlertStep),
    Report(ReportStep),
}

impl FlowState {
    pub fn kind(&self) -> FlowKind {
        match self {
            Self::Document(_) => FlowKind::Document,
            Self::Photo(_) => FlowKind::Photo,
            Self::DailyLog(_) => FlowKind::DailyLog,
            Self::Alert(_) => FlowKind::Alert,
            Self::Report(_) => FlowKind::Report,
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document(step) => write!(f, "{}:{step}", self.kind()),
            Self::Photo(step) => write!(f, "{}:{step}", self.kind()),
            Self::DailyLog(step) => write!(f, "{}:{step}", self.kind()),
            Self::Alert(step) => write!(f, "{}:{step}", self.kind()),
            Self::Report(step) => write!(f, "{}:{step}", self.kind()),
        }
    }
}

impl FromStr for FlowState {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, step) = s
            .split_once(':')
            .ok_or(strum::ParseError::VariantNotFound)?;
        Ok(match kind.parse::<FlowKind>()? {
            FlowKind::Document => Self::Document(step.parse()?),
            FlowKind::Photo => Self::Photo(step.parse()?),
            FlowKind::DailyLog => Self::DailyLog(step.parse()?),
            FlowKind::Alert => Self::Alert(step.parse()?),
            FlowKind::Report => Self::Report(step.parse()?),
        })
    }
}

/// An active flow with its accumulated draft, as persisted in the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "flow", rename_all = "snake_case")]
pub enum FlowContext {
    Document {
        step: DocumentStep,
        draft: DocumentDraft,
    },
    Photo {
        step: PhotoStep,
        draft: PhotoDraft,
    },
    DailyLog {
        step: DailyLogStep,
        draft: DailyLogDraft,
    },
    Alert {
        step: AlertStep,
        draft: AlertDraft,
    },
    Report {
        step: ReportStep,
        draft: ReportDraft,
    },
}

impl FlowContext {
    pub fn state(&self) -> FlowState {
        match self {
            Self::Document { step, .. } => FlowState::Document(*step),
            Self::Photo { step, .. } => FlowState::Photo(*step),
            Self::DailyLog { step, .. } => FlowState::DailyLog(*step),
            Self::Alert { step, .. } => FlowState::Alert(*step),
            Self::Report { step, .. } => FlowState::Report(*step),
        }
    }
}

// --- Prompts ---

/// One selectable option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// What a step accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Exactly one of the options, by button.
    Choice(Vec<Choice>),
    /// Any non-empty subset of the options, toggled by button and closed with "done".
    MultiChoice {
        options: Vec<Choice>,
        selected: Vec<String>,
    },
    /// A text reply. Suggestions are offered as buttons that count as typed text.
    Text {
        skippable: bool,
        suggestions: Vec<String>,
    },
    /// File attachments up to `limit`.
    Files {
        received: usize,
        limit: usize,
        skippable: bool,
    },
    /// The final confirmation.
    Confirm,
}

/// A step prompt, rendered onto the pinned message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub title: String,
    pub lines: Vec<String>,
    pub question: String,
    pub input: Input,
    /// Buttons per row for choices.
    pub columns: usize,
    /// Pick the only option without asking.
    pub auto_pick: bool,
}

impl Prompt {
    pub fn new(title: impl Into<String>, question: impl Into<String>, input: Input) -> Self {
        Self {
            title: title.into(),
            lines: Vec::new(),
            question: question.into(),
            input,
            columns: 1,
            auto_pick: false,
        }
    }

    /// Append a summary line. The text is HTML-escaped.
    pub fn line(mut self, label: &str, value: impl fmt::Display) -> Self {
        self.lines
            .push(format!("{label}: <b>{}</b>", escape(&value.to_string())));
        self
    }

    pub fn columns(mut self, columns: usize) -> Self {
        self.columns = columns.max(1);
        self
    }

    pub fn auto_pick(mut self) -> Self {
        self.auto_pick = true;
        self
    }

    /// The single option when auto-pick applies.
    pub(crate) fn only_choice(&self) -> Option<&Choice> {
        match &self.input {
            Input::Choice(options) if self.auto_pick && options.len() == 1 => options.first(),
            _ => None,
        }
    }

    pub fn render(&self, error: Option<&str>) -> Screen {
        let mut text = format!("<b>{}</b>\n{SEP}\n", escape(&self.title));
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        if !self.lines.is_empty() {
            text.push('\n');
        }
        if let Some(error) = error {
            text.push_str(&format!("⚠️ {}\n", escape(error)));
        }
        text.push_str(&escape(&self.question));

        let mut keyboard = Keyboard::new();
        match &self.input {
            Input::Choice(options) => {
                if options.is_empty() {
                    text.push_str("\n\n<i>Nothing available.</i>");
                }
                for chunk in options.chunks(self.columns) {
                    keyboard = keyboard.row(
                        chunk
                            .iter()
                            .map(|c| {
                                InlineButton::callback(&c.label, callback::flow_value("pick", &c.value))
                            })
                            .collect(),
                    );
                }
            }
            Input::MultiChoice { options, selected } => {
                for chunk in options.chunks(2) {
                    keyboard = keyboard.row(
                        chunk
                            .iter()
                            .map(|c| {
                                let mark = if selected.contains(&c.value) { "✅" } else { "▫️" };
                                InlineButton::callback(
                                    format!("{mark} {}", c.label),
                                    callback::flow_value("toggle", &c.value),
                                )
                            })
                            .collect(),
                    );
                }
                keyboard =
                    keyboard.button(InlineButton::callback("➡️ Done", callback::flow("done")));
            }
            Input::Text {
                skippable,
                suggestions,
            } => {
                for chunk in suggestions.chunks(4) {
                    keyboard = keyboard.row(
                        chunk
                            .iter()
                            .map(|s| InlineButton::callback(s, callback::flow_value("pick", s)))
                            .collect(),
                    );
                }
                if *skippable {
                    keyboard =
                        keyboard.button(InlineButton::callback("⏭ Skip", callback::flow("skip")));
                }
            }
            Input::Files {
                received,
                limit,
                skippable,
            } => {
                text.push_str(&format!("\n\nReceived: <b>{received} / {limit}</b>"));
                if *received > 0 {
                    keyboard = keyboard.button(InlineButton::callback(
                        format!("✅ Done ({received})"),
                        callback::flow("done"),
                    ));
                } else if *skippable {
                    keyboard =
                        keyboard.button(InlineButton::callback("⏭ Skip", callback::flow("skip")));
                }
            }
            Input::Confirm => {
                keyboard =
                    keyboard.button(InlineButton::callback("✅ Confirm", callback::flow("confirm")));
            }
        }
        keyboard = keyboard.button(InlineButton::callback("✖️ Cancel", callback::flow("cancel")));
        Screen::new(text, keyboard)
    }
}

// --- Answers ---

/// Raw input as it arrives from the chat, before step validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// A stored file reference.
    File(String),
    Pick(String),
    Toggle(String),
    Done,
    Skip,
    Confirm,
}

/// Input that passed the structural checks of the current step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Text(String),
    File(String),
    Picked(Choice),
    Toggled(String),
    Done,
    Skip,
    Confirm,
}

/// The outcome of feeding an answer to a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance<S> {
    To(S),
    Stay,
    Invalid(String),
    Commit,
}

pub(crate) const USE_BUTTONS: &str = "Please use the buttons below.";
pub(crate) const OPTION_GONE: &str = "That option is no longer available.";
pub(crate) const NOTHING_SELECTED: &str = "Select at least one option first.";
pub(crate) const NO_FILES: &str = "Send at least one file first.";
pub(crate) const NOT_SKIPPABLE: &str = "This step cannot be skipped.";
pub(crate) const FILE_EXPECTED: &str = "Please send a photo or a file.";
pub(crate) const FILE_LIMIT: &str = "No more files are accepted here.";
pub(crate) const TEXT_EXPECTED: &str = "Please type your answer.";

/// Check that `reply` fits the kind of input the step asks for.
pub(crate) fn validate(input: &Input, reply: Reply) -> Result<Answer, &'static str> {
    match (input, reply) {
        (Input::Text { .. }, Reply::Text(text)) => Ok(Answer::Text(text.trim().to_string())),
        (Input::Text { suggestions, .. }, Reply::Pick(value)) => {
            if suggestions.contains(&value) {
                Ok(Answer::Text(value))
            } else {
                Err(OPTION_GONE)
            }
        }
        (Input::Text { skippable: true, .. }, Reply::Skip) => Ok(Answer::Skip),
        (Input::Text { .. }, Reply::File(_)) => Err(TEXT_EXPECTED),

        (Input::Choice(options), Reply::Pick(value)) => options
            .iter()
            .find(|c| c.value == value)
            .cloned()
            .map(Answer::Picked)
            .ok_or(OPTION_GONE),

        (Input::MultiChoice { options, .. }, Reply::Toggle(value)) => {
            if options.iter().any(|c| c.value == value) {
                Ok(Answer::Toggled(value))
            } else {
                Err(OPTION_GONE)
            }
        }
        (Input::MultiChoice { selected, .. }, Reply::Done) => {
            if selected.is_empty() {
                Err(NOTHING_SELECTED)
            } else {
                Ok(Answer::Done)
            }
        }

        (
            Input::Files {
                received, limit, ..
            },
            Reply::File(reference),
        ) => {
            if received < limit {
                Ok(Answer::File(reference))
            } else {
                Err(FILE_LIMIT)
            }
        }
        (Input::Files { received, .. }, Reply::Done) => {
            if *received > 0 {
                Ok(Answer::Done)
            } else {
                Err(NO_FILES)
            }
        }
        (
            Input::Files {
                received: 0,
                skippable: true,
                ..
            },
            Reply::Skip,
        ) => Ok(Answer::Skip),
        (Input::Files { .. }, Reply::Text(_)) => Err(FILE_EXPECTED),

        (Input::Confirm, Reply::Confirm) => Ok(Answer::Confirm),

        (_, Reply::Skip) => Err(NOT_SKIPPABLE),
        (_, Reply::File(_)) => Err(TEXT_EXPECTED),
        (_, Reply::Done) => Err(NOTHING_SELECTED),
        _ => Err(USE_BUTTONS),
    }
}

// --- Flow trait ---

/// Everything a flow may read while prompting or committing.
pub struct FlowCx<'a> {
    pub store: &'a dyn StorageAdapter,
    pub identity: &'a Identity,
    pub role: Role,
    pub now: DateTime<Utc>,
    pub settings: &'a WorkflowSettings,
}

impl FlowCx<'_> {
    pub fn submitter(&self) -> Submitter {
        Submitter {
            user_id: self.identity.user_id.clone(),
            role: self.role,
            chat_id: Some(self.identity.chat_id),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.settings.local_date(self.now)
    }

    /// Active projects visible to the user.
    pub async fn project_choices(&self) -> Result<Vec<Choice>, SiteError> {
        let scope = self.identity.project_scope();
        let projects = self.store.active_projects(scope.as_deref()).await?;
        Ok(projects
            .into_iter()
            .map(|p| Choice::new(p.id, p.name))
            .collect())
    }

    pub async fn facade_choices(&self, project_id: &str) -> Result<Vec<Choice>, SiteError> {
        let facades = self.store.facades(project_id).await?;
        Ok(facades
            .into_iter()
            .map(|f| Choice::new(f.id, f.name))
            .collect())
    }

    /// Floors of a facade, top floor first; finished floors carry [`DONE_MARK`].
    pub async fn floor_choices(&self, facade_id: &str) -> Result<Vec<Choice>, SiteError> {
        let mut floors = self.store.floors(facade_id).await?;
        floors.reverse();
        Ok(floors
            .into_iter()
            .map(|f| {
                let label = if f.status == FloorStatus::Done {
                    format!("{DONE_MARK}{}", f.floor_number)
                } else {
                    f.floor_number.to_string()
                };
                Choice::new(f.id, label)
            })
            .collect())
    }
}

/// Prefix on the label of a floor whose plan is met.
pub const DONE_MARK: &str = "✅";

/// Floor number from a label built by [`FlowCx::floor_choices`].
pub fn floor_number(label: &str) -> Option<i32> {
    label.trim_start_matches(DONE_MARK).parse().ok()
}

/// A guided flow over a typed draft.
#[async_trait]
pub trait Flow: Send + Sync {
    type Step: Copy + PartialEq + fmt::Debug + fmt::Display + Send + Sync;
    type Draft: Default + Clone + Send + Sync;

    fn first(&self) -> Self::Step;

    async fn prompt(
        &self,
        cx: &FlowCx<'_>,
        step: Self::Step,
        draft: &Self::Draft,
    ) -> Result<Prompt, SiteError>;

    /// Merge a structurally valid answer. Must leave `draft` untouched unless it advances or stays.
    fn accept(
        &self,
        step: Self::Step,
        draft: &mut Self::Draft,
        answer: Answer,
    ) -> Advance<Self::Step>;

    /// Write the draft. Returns the success screen.
    async fn commit(&self, cx: &FlowCx<'_>, draft: &Self::Draft) -> Result<Screen, SiteError>;

    fn pack(&self, step: Self::Step, draft: Self::Draft) -> FlowContext;

    /// Short notice sent after a file arrives, if the flow wants one.
    fn notice(&self, _draft: &Self::Draft) -> Option<String> {
        None
    }

    /// Where the id of the last notice is kept, so it can be deleted when superseded.
    fn notice_slot<'d>(&self, _draft: &'d mut Self::Draft) -> Option<&'d mut Option<i64>> {
        None
    }
}

/// Fetch a required draft field at commit time.
pub(crate) fn required<'d, T: ?Sized>(
    value: Option<&'d T>,
    field: &'static str,
) -> Result<&'d T, SiteError> {
    value.ok_or_else(|| SiteError::Internal(format!("flow draft is missing {field}")))
}

/// Answers a step does not expect. Only reachable if validation and the step disagree.
pub(crate) fn unexpected<S>(step: S, answer: &Answer) -> Advance<S>
where
    S: fmt::Debug,
{
    tracing::debug!(?step, ?answer, "answer does not fit step");
    Advance::Invalid(USE_BUTTONS.to_string())
}

/// Minimum-length text check shared by the free-text steps.
pub(crate) fn min_chars(text: &str, min: usize, message: &str) -> Result<String, String> {
    let text = text.trim();
    if text.chars().count() < min {
        Err(message.to_string())
    } else {
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn choices() -> Input {
        Input::Choice(vec![Choice::new("fa", "A"), Choice::new("fb", "B")])
    }

    #[test]
    fn state_tags_round_trip() {
        let states = [
            FlowState::Document(DocumentStep::Recipients),
            FlowState::Photo(PhotoStep::Files),
            FlowState::DailyLog(DailyLogStep::Workers),
            FlowState::Alert(AlertStep::Priority),
            FlowState::Report(ReportStep::Floor),
        ];
        for state in states {
            let tag = state.to_string();
            assert_eq!(tag.parse::<FlowState>().unwrap(), state, "{tag}");
        }
        assert_eq!(FlowState::Report(ReportStep::Floor).to_string(), "report:floor");
        assert_eq!(FlowState::DailyLog(DailyLogStep::Zone).to_string(), "log:zone");
        assert!("report:nowhere".parse::<FlowState>().is_err());
        assert!("idle".parse::<FlowState>().is_err());
    }

    #[test]
    fn every_step_has_a_distinct_tag() {
        let mut tags: Vec<String> = Vec::new();
        tags.extend(DocumentStep::iter().map(|s| FlowState::Document(s).to_string()));
        tags.extend(PhotoStep::iter().map(|s| FlowState::Photo(s).to_string()));
        tags.extend(DailyLogStep::iter().map(|s| FlowState::DailyLog(s).to_string()));
        tags.extend(AlertStep::iter().map(|s| FlowState::Alert(s).to_string()));
        tags.extend(ReportStep::iter().map(|s| FlowState::Report(s).to_string()));
        let count = tags.len();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), count);
    }

    #[test]
    fn context_is_tagged_json() {
        let ctx = FlowContext::Report {
            step: ReportStep::Value,
            draft: ReportDraft {
                project_id: Some("p1".into()),
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["flow"], "report");
        assert_eq!(json["step"], "value");
        let back: FlowContext = serde_json::from_value(json).unwrap();
        assert_eq!(back, ctx);
        assert_eq!(back.state(), FlowState::Report(ReportStep::Value));
    }

    #[test]
    fn picks_must_be_offered() {
        assert_eq!(
            validate(&choices(), Reply::Pick("fb".into())),
            Ok(Answer::Picked(Choice::new("fb", "B")))
        );
        assert_eq!(validate(&choices(), Reply::Pick("zz".into())), Err(OPTION_GONE));
        assert_eq!(validate(&choices(), Reply::Text("A".into())), Err(USE_BUTTONS));
    }

    #[test]
    fn skip_only_where_allowed() {
        let optional = Input::Text {
            skippable: true,
            suggestions: vec![],
        };
        let mandatory = Input::Text {
            skippable: false,
            suggestions: vec![],
        };
        assert_eq!(validate(&optional, Reply::Skip), Ok(Answer::Skip));
        assert_eq!(validate(&mandatory, Reply::Skip), Err(NOT_SKIPPABLE));
    }

    #[test]
    fn suggestions_count_as_text() {
        let input = Input::Text {
            skippable: false,
            suggestions: vec!["5".into(), "10".into()],
        };
        assert_eq!(
            validate(&input, Reply::Pick("10".into())),
            Ok(Answer::Text("10".into()))
        );
        assert_eq!(
            validate(&input, Reply::Text("  18 ".into())),
            Ok(Answer::Text("18".into()))
        );
    }

    #[test]
    fn file_steps_respect_limits() {
        let empty = Input::Files {
            received: 0,
            limit: 5,
            skippable: false,
        };
        let full = Input::Files {
            received: 5,
            limit: 5,
            skippable: false,
        };
        assert_eq!(validate(&empty, Reply::Done), Err(NO_FILES));
        assert_eq!(validate(&full, Reply::File("x".into())), Err(FILE_LIMIT));
        assert_eq!(validate(&full, Reply::Done), Ok(Answer::Done));
        assert_eq!(validate(&empty, Reply::Text("hi".into())), Err(FILE_EXPECTED));
        assert_eq!(validate(&empty, Reply::Skip), Err(NOT_SKIPPABLE));
    }

    #[test]
    fn multi_choice_needs_a_selection() {
        let input = Input::MultiChoice {
            options: vec![Choice::new("pm", "PM")],
            selected: vec![],
        };
        assert_eq!(validate(&input, Reply::Done), Err(NOTHING_SELECTED));
        assert_eq!(
            validate(&input, Reply::Toggle("pm".into())),
            Ok(Answer::Toggled("pm".into()))
        );
    }

    #[test]
    fn prompt_renders_buttons_and_cancel() {
        let prompt = Prompt::new("Report", "Choose a floor:", choices())
            .line("Facade", "A & B")
            .columns(2);
        let screen = prompt.render(Some("Bad <input>"));
        assert!(screen.text.contains("A &amp; B"));
        assert!(screen.text.contains("⚠️ Bad &lt;input&gt;"));
        assert_eq!(
            screen.callbacks(),
            vec!["flow:pick:fa", "flow:pick:fb", "flow:cancel"]
        );
        assert_eq!(screen.keyboard.rows[0].len(), 2);
    }

    #[test]
    fn auto_pick_needs_exactly_one_option() {
        let single = Prompt::new("t", "q", Input::Choice(vec![Choice::new("p1", "Tower")]));
        assert!(single.only_choice().is_none());
        let single = single.auto_pick();
        assert_eq!(single.only_choice().unwrap().value, "p1");
        assert!(Prompt::new("t", "q", choices()).auto_pick().only_choice().is_none());
    }
}
