// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage traits for sessions, identities, the inbox, the outbound queue,
//! approvals, and the construction-site tables.
//!
//! The traits are split by concern so each reads on its own; a backend
//! implements all of them and exposes the union as [`StorageAdapter`].

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::SiteError;
use crate::records::{
    Alert, AlertSubmission, AssignedTask, DailyLogSubmission, DocumentSubmission, Facade,
    FactSummary, Floor, FloorProgress, ForemanOnDuty, MaterialDeficit, OpenOrder,
    PhotoSubmission, Project, ProjectProgress, ReportSubmission, StageAcceptance, StageOutcome,
    Task, TaskStatus, Verdict,
};
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Approval, Decision, DecisionOutcome, EnqueueOutcome, EventType, Identity, InboxItem,
    InboxStatus, NewApproval, NewEvent, NewInboxItem, NotificationPreferences, QueuedEvent, Role,
    Session,
};

/// Per-chat conversation state.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the live session for a chat; expired rows read as absent.
    async fn load_session(
        &self,
        chat_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, SiteError>;

    /// Upserts the whole session row.
    async fn save_session(&self, session: &Session) -> Result<(), SiteError>;

    /// Resets a chat to idle with an empty context, keeping the pinned message.
    async fn clear_session(
        &self,
        chat_id: i64,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), SiteError>;

    /// Deletes rows that expired before `cutoff`. Returns the number removed.
    async fn purge_expired_sessions(&self, cutoff: DateTime<Utc>) -> Result<usize, SiteError>;
}

/// Chat-to-user bindings, role grants and preferences.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn identity_by_chat(&self, chat_id: i64) -> Result<Option<Identity>, SiteError>;

    async fn identity_by_user(&self, user_id: &str) -> Result<Option<Identity>, SiteError>;

    async fn update_preferences(
        &self,
        user_id: &str,
        preferences: &NotificationPreferences,
    ) -> Result<(), SiteError>;

    /// Foremen whose grants cover the project (unscoped or scoped to it).
    async fn foremen_for_project(&self, project_id: &str)
    -> Result<Vec<ForemanOnDuty>, SiteError>;
}

/// Role-addressed work items.
#[async_trait]
pub trait InboxLedger: Send + Sync {
    /// Stores a new item with status `new`. Returns its id.
    async fn post_inbox(&self, item: &NewInboxItem, now: DateTime<Utc>)
    -> Result<i64, SiteError>;

    /// Items addressed to any of `roles` within `scope`, newest first.
    ///
    /// `None` means every project; items without a project are always included.
    async fn list_inbox(
        &self,
        scope: Option<&[String]>,
        roles: &[Role],
        limit: usize,
    ) -> Result<Vec<InboxItem>, SiteError>;

    async fn get_inbox(&self, id: i64) -> Result<Option<InboxItem>, SiteError>;

    /// Moves an item forward to `target`. Never regresses; returns the resulting status.
    ///
    /// Reaching `processed` is recorded in the audit log under `by`.
    async fn advance_inbox(
        &self,
        id: i64,
        target: InboxStatus,
        by: &str,
        now: DateTime<Utc>,
    ) -> Result<InboxStatus, SiteError>;

    /// Count of `new` items addressed to any of `roles` within `scope`.
    async fn count_unread(
        &self,
        scope: Option<&[String]>,
        roles: &[Role],
    ) -> Result<i64, SiteError>;

    /// Document items still `new` that were created before `cutoff`.
    async fn stale_documents(&self, cutoff: DateTime<Utc>) -> Result<Vec<InboxItem>, SiteError>;
}

/// Outbound notification queue.
#[async_trait]
pub trait EventQueue: Send + Sync {
    async fn event_exists(&self, dedup_key: &str) -> Result<bool, SiteError>;

    /// Inserts unless an event with the same dedup key already exists.
    async fn enqueue_event(
        &self,
        event: &NewEvent,
        now: DateTime<Utc>,
    ) -> Result<EnqueueOutcome, SiteError>;

    /// Pending events due at or before `now`, oldest first.
    async fn pending_events(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<QueuedEvent>, SiteError>;

    /// Marks a pending event as sent. Returns `false` if it was not pending.
    async fn mark_event_sent(&self, id: i64, now: DateTime<Utc>) -> Result<bool, SiteError>;

    async fn events_of_type(&self, event_type: EventType) -> Result<Vec<QueuedEvent>, SiteError>;
}

/// Multi-level sign-off records.
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn create_approval(
        &self,
        approval: &NewApproval,
        now: DateTime<Utc>,
    ) -> Result<i64, SiteError>;

    async fn get_approval(&self, id: i64) -> Result<Option<Approval>, SiteError>;

    /// Pending approvals visible in `scope` (`None` means every project).
    async fn pending_approvals(
        &self,
        scope: Option<&[String]>,
        limit: usize,
    ) -> Result<Vec<Approval>, SiteError>;

    /// Records a decision. Only the first decision changes the row.
    async fn decide_approval(
        &self,
        id: i64,
        decision: Decision,
        decided_by: &str,
        now: DateTime<Utc>,
    ) -> Result<DecisionOutcome, SiteError>;
}

/// Projects, progress, tasks, alerts, supply and the flow commit points.
#[async_trait]
pub trait SiteStore: Send + Sync {
    /// Active projects visible in `scope` (`None` means every project), by name.
    async fn active_projects(&self, scope: Option<&[String]>) -> Result<Vec<Project>, SiteError>;

    async fn get_project(&self, id: &str) -> Result<Option<Project>, SiteError>;

    async fn project_progress(&self, id: &str) -> Result<Option<ProjectProgress>, SiteError>;

    async fn facades(&self, project_id: &str) -> Result<Vec<Facade>, SiteError>;

    async fn floors(&self, facade_id: &str) -> Result<Vec<Floor>, SiteError>;

    async fn get_floor(&self, id: &str) -> Result<Option<Floor>, SiteError>;

    // --- tasks ---

    async fn tasks_for_user(&self, user_id: &str) -> Result<Vec<Task>, SiteError>;

    async fn get_task(&self, id: i64) -> Result<Option<Task>, SiteError>;

    async fn set_task_status(
        &self,
        id: i64,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<Task, SiteError>;

    /// Open tasks with no reminder yet whose deadline falls in `[from, until]`.
    async fn tasks_due_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<AssignedTask>, SiteError>;

    /// Open tasks whose deadline passed before `now`.
    async fn overdue_tasks(&self, now: DateTime<Utc>) -> Result<Vec<AssignedTask>, SiteError>;

    /// Sets the one-shot reminder marker. Returns `false` if it was already set.
    async fn mark_reminder_sent(&self, task_id: i64) -> Result<bool, SiteError>;

    // --- alerts ---

    async fn open_alerts(
        &self,
        scope: Option<&[String]>,
        limit: usize,
    ) -> Result<Vec<Alert>, SiteError>;

    /// Unresolved alerts on a project created before `cutoff`.
    async fn alerts_open_since(
        &self,
        project_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Alert>, SiteError>;

    async fn get_alert(&self, id: i64) -> Result<Option<Alert>, SiteError>;

    /// Resolves an alert. Returns `false` if it was already resolved.
    async fn resolve_alert(
        &self,
        id: i64,
        resolved_by: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, SiteError>;

    // --- supply and production ---

    async fn material_deficits(&self, project_id: &str)
    -> Result<Vec<MaterialDeficit>, SiteError>;

    async fn open_orders(&self, project_id: &str) -> Result<Vec<OpenOrder>, SiteError>;

    // --- progress reporting ---

    /// Plan/fact totals for a project over `[from, to]` local dates.
    async fn fact_summary(
        &self,
        project_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<FactSummary, SiteError>;

    /// Whether the user filed a progress report or daily log for the project on `date`.
    async fn has_report(
        &self,
        project_id: &str,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<bool, SiteError>;

    // --- stage acceptance ---

    /// Stages awaiting the inspector within `scope`, newest first.
    async fn pending_stages(
        &self,
        scope: Option<&[String]>,
        limit: usize,
    ) -> Result<Vec<StageAcceptance>, SiteError>;

    async fn get_stage(&self, id: i64) -> Result<Option<StageAcceptance>, SiteError>;

    /// Records the inspector's verdict. Only the first verdict changes the row.
    async fn decide_stage(
        &self,
        id: i64,
        verdict: Verdict,
        inspector_id: &str,
        now: DateTime<Utc>,
    ) -> Result<StageOutcome, SiteError>;

    /// Stages the inspector decided, most recent first.
    async fn stage_history(
        &self,
        inspector_id: &str,
        limit: usize,
    ) -> Result<Vec<StageAcceptance>, SiteError>;

    // --- flow commits; each is a single transaction that also writes the audit log ---

    async fn submit_document(
        &self,
        doc: &DocumentSubmission,
        now: DateTime<Utc>,
    ) -> Result<i64, SiteError>;

    /// Stores the batch, fans it out and appends the files to the floor's photo list.
    async fn submit_photos(
        &self,
        batch: &PhotoSubmission,
        now: DateTime<Utc>,
    ) -> Result<i64, SiteError>;

    /// Stores the log, a level-1 pending approval and the pm inbox item.
    async fn submit_daily_log(
        &self,
        log: &DailyLogSubmission,
        now: DateTime<Utc>,
    ) -> Result<i64, SiteError>;

    async fn submit_alert(
        &self,
        alert: &AlertSubmission,
        now: DateTime<Utc>,
    ) -> Result<i64, SiteError>;

    /// Stores the plan/fact row and adds the value to the floor's cumulative fact.
    async fn submit_report(
        &self,
        report: &ReportSubmission,
        now: DateTime<Utc>,
    ) -> Result<FloorProgress, SiteError>;
}

/// A complete storage backend.
#[async_trait]
pub trait StorageAdapter:
    PluginAdapter + SessionStore + Directory + InboxLedger + EventQueue + ApprovalStore + SiteStore
{
    /// Opens the backend and applies pending migrations.
    async fn initialize(&self) -> Result<(), SiteError>;

    /// Flushes and closes the backend.
    async fn close(&self) -> Result<(), SiteError>;
}
