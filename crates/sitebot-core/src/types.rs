// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Sitebot workspace.
//!
//! Covers organizational roles, chat sessions, resolved identities, the inbox
//! and outbound-queue records, approvals, and the transport-neutral shapes of
//! inbound chat events and inline keyboards.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`PluginAdapter`](crate::PluginAdapter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Storage,
}

// --- Roles ---

/// Organizational role held by a user.
///
/// Variant order is the precedence order used to pick a user's primary role:
/// earlier variants win. The derived `Ord` relies on this.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Director,
    Pm,
    #[strum(to_string = "project_opr", serialize = "opr")]
    #[serde(alias = "opr")]
    ProjectOpr,
    #[strum(to_string = "project_km", serialize = "km")]
    #[serde(alias = "km")]
    ProjectKm,
    #[strum(to_string = "project_kmd", serialize = "kmd")]
    #[serde(alias = "kmd")]
    ProjectKmd,
    Project,
    Supply,
    Production,
    Foreman1,
    Foreman2,
    Foreman3,
    Pto,
    Inspector,
    Generic,
}

impl Role {
    /// Parse a stored role tag. Unknown tags yield `None` and are ignored by callers.
    pub fn parse_tag(tag: &str) -> Option<Self> {
        tag.trim().parse().ok()
    }

    /// Returns `true` for the three foreman variants.
    pub fn is_foreman(self) -> bool {
        matches!(self, Self::Foreman1 | Self::Foreman2 | Self::Foreman3)
    }

    /// Human-readable label used on screens.
    pub fn label(self) -> &'static str {
        match self {
            Self::Director => "Director",
            Self::Pm => "Project manager",
            Self::ProjectOpr => "OPR lead",
            Self::ProjectKm => "KM lead",
            Self::ProjectKmd => "KMD lead",
            Self::Project => "Design office",
            Self::Supply => "Supply",
            Self::Production => "Production",
            Self::Foreman1 | Self::Foreman2 | Self::Foreman3 => "Foreman",
            Self::Pto => "PTO engineer",
            Self::Inspector => "Inspector",
            Self::Generic => "Staff",
        }
    }
}

/// A role grant, optionally scoped to a single project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role: Role,
    /// `None` grants the role on every project.
    pub project_id: Option<String>,
}

// --- Identity ---

/// Per-user notification switches, stored as JSON on the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    #[serde(default = "enabled")]
    pub report_reminders: bool,
    #[serde(default = "enabled")]
    pub deadline_warnings: bool,
    #[serde(default = "enabled")]
    pub daily_digest: bool,
    #[serde(default = "enabled")]
    pub alert_notifications: bool,
}

fn enabled() -> bool {
    true
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            report_reminders: true,
            deadline_warnings: true,
            daily_digest: true,
            alert_notifications: true,
        }
    }
}

/// Names one switch inside [`NotificationPreferences`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum PreferenceKey {
    ReportReminders,
    DeadlineWarnings,
    DailyDigest,
    AlertNotifications,
}

impl PreferenceKey {
    pub fn label(self) -> &'static str {
        match self {
            Self::ReportReminders => "Report reminders",
            Self::DeadlineWarnings => "Deadline warnings",
            Self::DailyDigest => "Daily digest",
            Self::AlertNotifications => "Alert notifications",
        }
    }
}

impl NotificationPreferences {
    pub fn get(&self, key: PreferenceKey) -> bool {
        match key {
            PreferenceKey::ReportReminders => self.report_reminders,
            PreferenceKey::DeadlineWarnings => self.deadline_warnings,
            PreferenceKey::DailyDigest => self.daily_digest,
            PreferenceKey::AlertNotifications => self.alert_notifications,
        }
    }

    /// Flip one switch and return the new value.
    pub fn toggle(&mut self, key: PreferenceKey) -> bool {
        let slot = match key {
            PreferenceKey::ReportReminders => &mut self.report_reminders,
            PreferenceKey::DeadlineWarnings => &mut self.deadline_warnings,
            PreferenceKey::DailyDigest => &mut self.daily_digest,
            PreferenceKey::AlertNotifications => &mut self.alert_notifications,
        };
        *slot = !*slot;
        *slot
    }
}

/// A chat resolved to a platform user.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub user_id: String,
    pub display_name: String,
    pub chat_id: i64,
    pub grants: Vec<RoleGrant>,
    pub preferences: NotificationPreferences,
}

impl Identity {
    /// Distinct roles held by the user, in precedence order.
    pub fn roles(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self.grants.iter().map(|g| g.role).collect();
        roles.sort();
        roles.dedup();
        roles
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.grants.iter().any(|g| g.role == role)
    }

    /// Project ids the user is restricted to, or `None` when any grant is unscoped.
    pub fn project_scope(&self) -> Option<Vec<String>> {
        if self.grants.is_empty() || self.grants.iter().any(|g| g.project_id.is_none()) {
            return None;
        }
        let mut ids: Vec<String> = self
            .grants
            .iter()
            .filter_map(|g| g.project_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        Some(ids)
    }
}

// --- Sessions ---

/// State tag of a session with no active flow.
pub const IDLE_STATE: &str = "idle";

/// Per-chat conversation state as persisted by the session store.
///
/// `context` is opaque here; the workflow layer decodes it into its typed
/// flow draft and checks it against `state`.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub chat_id: i64,
    pub user_id: Option<String>,
    pub state: String,
    pub context: serde_json::Value,
    pub pinned_message_id: Option<i64>,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn is_idle(&self) -> bool {
        self.state == IDLE_STATE
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

// --- Inbox ---

/// Lifecycle of an inbox item. Ordering follows the only permitted direction.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InboxStatus {
    New,
    Read,
    Processed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InboxKind {
    Document,
    PhotoReport,
    Alert,
    DailyLog,
    Report,
}

impl InboxKind {
    pub fn icon(self) -> &'static str {
        match self {
            Self::Document => "📄",
            Self::PhotoReport => "📷",
            Self::Alert => "🚨",
            Self::DailyLog => "📝",
            Self::Report => "📊",
        }
    }
}

/// An inbox item before it is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInboxItem {
    pub project_id: Option<String>,
    pub from_role: Role,
    pub from_user_id: Option<String>,
    pub to_roles: Vec<Role>,
    pub kind: InboxKind,
    pub title: String,
    pub description: Option<String>,
    pub file_reference: Option<String>,
}

impl NewInboxItem {
    /// Split into one item per recipient role.
    pub fn fan_out(self, recipients: &[Role]) -> Vec<NewInboxItem> {
        recipients
            .iter()
            .map(|role| NewInboxItem {
                to_roles: vec![*role],
                ..self.clone()
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InboxItem {
    pub id: i64,
    pub project_id: Option<String>,
    pub from_role: Role,
    pub from_user_id: Option<String>,
    pub to_roles: Vec<Role>,
    pub kind: InboxKind,
    pub title: String,
    pub description: Option<String>,
    pub file_reference: Option<String>,
    pub status: InboxStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Outbound queue ---

/// Closed catalogue of scheduler-produced event types.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    Serialize,
    Deserialize,
)]
pub enum EventType {
    #[strum(serialize = "plan.morning")]
    #[serde(rename = "plan.morning")]
    PlanMorning,
    #[strum(serialize = "director.digest")]
    #[serde(rename = "director.digest")]
    DirectorDigest,
    #[strum(serialize = "briefing.supply")]
    #[serde(rename = "briefing.supply")]
    BriefingSupply,
    #[strum(serialize = "briefing.production")]
    #[serde(rename = "briefing.production")]
    BriefingProduction,
    #[strum(serialize = "briefing.pto")]
    #[serde(rename = "briefing.pto")]
    BriefingPto,
    #[strum(serialize = "briefing.inspector")]
    #[serde(rename = "briefing.inspector")]
    BriefingInspector,
    #[strum(serialize = "alert.overdue")]
    #[serde(rename = "alert.overdue")]
    AlertOverdue,
    #[strum(serialize = "document.overdue")]
    #[serde(rename = "document.overdue")]
    DocumentOverdue,
    #[strum(serialize = "task.deadline")]
    #[serde(rename = "task.deadline")]
    TaskDeadline,
    #[strum(serialize = "task.overdue")]
    #[serde(rename = "task.overdue")]
    TaskOverdue,
    #[strum(serialize = "report.missing")]
    #[serde(rename = "report.missing")]
    ReportMissing,
    #[strum(serialize = "weekly.summary")]
    #[serde(rename = "weekly.summary")]
    WeeklySummary,
    #[strum(serialize = "evening.fact")]
    #[serde(rename = "evening.fact")]
    EveningFact,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

impl Priority {
    pub fn icon(self) -> &'static str {
        match self {
            Self::Low => "⚪",
            Self::Normal => "🔵",
            Self::High => "🟠",
            Self::Critical => "🔴",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Sent,
    Skipped,
}

/// An event ready to be enqueued.
///
/// `subject` narrows the idempotency scope below project level, e.g. a task id
/// or a recipient user id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub event_type: EventType,
    pub project_id: Option<String>,
    pub subject: Option<String>,
    pub target_roles: Vec<Role>,
    pub target_users: Vec<String>,
    pub target_chat_ids: Vec<i64>,
    pub priority: Priority,
    pub payload: serde_json::Value,
    pub scheduled_at: DateTime<Utc>,
    pub local_date: NaiveDate,
}

impl NewEvent {
    /// Idempotency key: one event per type, project (or global), subject and local day.
    pub fn dedup_key(&self) -> String {
        dedup_key(
            self.event_type,
            self.project_id.as_deref(),
            self.subject.as_deref(),
            self.local_date,
        )
    }

    pub fn has_targets(&self) -> bool {
        !(self.target_roles.is_empty()
            && self.target_users.is_empty()
            && self.target_chat_ids.is_empty())
    }
}

/// Build the queue idempotency key for an event scope.
pub fn dedup_key(
    event_type: EventType,
    project_id: Option<&str>,
    subject: Option<&str>,
    local_date: NaiveDate,
) -> String {
    format!(
        "{event_type}|{}|{}|{}",
        project_id.unwrap_or("*"),
        subject.unwrap_or("-"),
        local_date.format("%Y-%m-%d")
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueuedEvent {
    pub id: i64,
    pub event_type: EventType,
    pub project_id: Option<String>,
    pub target_roles: Vec<Role>,
    pub target_users: Vec<String>,
    pub target_chat_ids: Vec<i64>,
    pub priority: Priority,
    pub payload: serde_json::Value,
    pub status: EventStatus,
    pub dedup_key: String,
    pub scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Result of an enqueue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Inserted(i64),
    Duplicate,
}

// --- Approvals ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalKind {
    DailyLog,
    MaterialRequest,
    TaskCompletion,
    Budget,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn status(self) -> ApprovalStatus {
        match self {
            Self::Approve => ApprovalStatus::Approved,
            Self::Reject => ApprovalStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewApproval {
    pub project_id: String,
    pub kind: ApprovalKind,
    pub title: String,
    pub description: Option<String>,
    pub level: i32,
    pub assigned_to: Option<String>,
    pub requested_by: Option<String>,
    pub entity_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Approval {
    pub id: i64,
    pub project_id: String,
    pub kind: ApprovalKind,
    pub title: String,
    pub description: Option<String>,
    pub level: i32,
    pub status: ApprovalStatus,
    pub assigned_to: Option<String>,
    pub requested_by: Option<String>,
    pub entity_id: Option<String>,
    pub decided_by: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// What happened when a decision was submitted.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionOutcome {
    /// The approval left `pending` with this call.
    Applied(Approval),
    /// The approval had already been decided; nothing changed.
    AlreadyDecided(Approval),
}

// --- Chat events ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Photo,
    Document,
}

/// A file sent by the user, referenced by the platform's file id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub file_id: String,
    pub file_name: Option<String>,
}

/// An inbound update reduced to what the dispatcher acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Text {
        chat_id: i64,
        message_id: i64,
        text: String,
    },
    Attachment {
        chat_id: i64,
        message_id: i64,
        attachment: Attachment,
        caption: Option<String>,
    },
    Callback {
        chat_id: i64,
        message_id: Option<i64>,
        callback_id: String,
        data: String,
    },
}

impl ChatEvent {
    pub fn chat_id(&self) -> i64 {
        match self {
            Self::Text { chat_id, .. }
            | Self::Attachment { chat_id, .. }
            | Self::Callback { chat_id, .. } => *chat_id,
        }
    }
}

// --- Keyboards ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    Callback(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub action: ButtonAction,
}

impl InlineButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Callback(data.into()),
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Url(url.into()),
        }
    }
}

/// Rows of inline buttons attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, row: Vec<InlineButton>) -> Self {
        if !row.is_empty() {
            self.rows.push(row);
        }
        self
    }

    pub fn button(self, button: InlineButton) -> Self {
        self.row(vec![button])
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All callback payloads in row order.
    pub fn callback_data(&self) -> Vec<&str> {
        self.rows
            .iter()
            .flatten()
            .filter_map(|b| match &b.action {
                ButtonAction::Callback(data) => Some(data.as_str()),
                ButtonAction::Url(_) => None,
            })
            .collect()
    }
}
