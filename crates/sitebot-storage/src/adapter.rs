// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage traits.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use sitebot_config::model::StorageConfig;
use sitebot_core::records::{
    Alert, AlertSubmission, AssignedTask, DailyLogSubmission, DocumentSubmission, Facade,
    FactSummary, Floor, FloorProgress, ForemanOnDuty, MaterialDeficit, OpenOrder,
    PhotoSubmission, Project, ProjectProgress, ReportSubmission, StageAcceptance, StageOutcome,
    Task, TaskStatus, Verdict,
};
use sitebot_core::types::{
    Approval, Decision, DecisionOutcome, EnqueueOutcome, EventType, Identity, InboxItem,
    InboxStatus, NewApproval, NewEvent, NewInboxItem, NotificationPreferences, QueuedEvent, Role,
    Session,
};
use sitebot_core::{
    AdapterType, ApprovalStore, Directory, EventQueue, HealthStatus, InboxLedger, PluginAdapter,
    SessionStore, SiteError, SiteStore, StorageAdapter,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates to the query modules. The
/// database is opened by [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// The connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database.
    pub fn from_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// Returns the underlying Database, or an error if not initialized.
    pub fn db(&self) -> Result<&Database, SiteError> {
        self.db.get().ok_or_else(|| SiteError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(db: &Database) -> Result<(), SiteError> {
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SiteError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("not initialized".into()));
        };
        let ping = db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch("SELECT 1;") })
            .await;
        Ok(match ping {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), SiteError> {
        if let Some(db) = self.db.get() {
            Self::checkpoint(db).await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), SiteError> {
        let path = self.config.database_path.clone();
        let db = Database::open_with(&path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| SiteError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), SiteError> {
        Self::checkpoint(self.db()?).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteStorage {
    async fn load_session(
        &self,
        chat_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, SiteError> {
        queries::sessions::load_session(self.db()?, chat_id, now).await
    }

    async fn save_session(&self, session: &Session) -> Result<(), SiteError> {
        queries::sessions::save_session(self.db()?, session).await
    }

    async fn clear_session(
        &self,
        chat_id: i64,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), SiteError> {
        queries::sessions::clear_session(self.db()?, chat_id, now, expires_at).await
    }

    async fn purge_expired_sessions(&self, cutoff: DateTime<Utc>) -> Result<usize, SiteError> {
        queries::sessions::purge_expired(self.db()?, cutoff).await
    }
}

#[async_trait]
impl Directory for SqliteStorage {
    async fn identity_by_chat(&self, chat_id: i64) -> Result<Option<Identity>, SiteError> {
        queries::directory::identity_by_chat(self.db()?, chat_id).await
    }

    async fn identity_by_user(&self, user_id: &str) -> Result<Option<Identity>, SiteError> {
        queries::directory::identity_by_user(self.db()?, user_id).await
    }

    async fn update_preferences(
        &self,
        user_id: &str,
        preferences: &NotificationPreferences,
    ) -> Result<(), SiteError> {
        queries::directory::update_preferences(self.db()?, user_id, preferences).await
    }

    async fn foremen_for_project(
        &self,
        project_id: &str,
    ) -> Result<Vec<ForemanOnDuty>, SiteError> {
        queries::directory::foremen_for_project(self.db()?, project_id).await
    }
}

#[async_trait]
impl InboxLedger for SqliteStorage {
    async fn post_inbox(&self, item: &NewInboxItem, now: DateTime<Utc>) -> Result<i64, SiteError> {
        queries::inbox::post(self.db()?, item, now).await
    }

    async fn list_inbox(
        &self,
        scope: Option<&[String]>,
        roles: &[Role],
        limit: usize,
    ) -> Result<Vec<InboxItem>, SiteError> {
        queries::inbox::list_for(self.db()?, scope, roles, limit).await
    }

    async fn get_inbox(&self, id: i64) -> Result<Option<InboxItem>, SiteError> {
        queries::inbox::get(self.db()?, id).await
    }

    async fn advance_inbox(
        &self,
        id: i64,
        target: InboxStatus,
        by: &str,
        now: DateTime<Utc>,
    ) -> Result<InboxStatus, SiteError> {
        queries::inbox::advance(self.db()?, id, target, by, now).await
    }

    async fn count_unread(
        &self,
        scope: Option<&[String]>,
        roles: &[Role],
    ) -> Result<i64, SiteError> {
        queries::inbox::count_unread(self.db()?, scope, roles).await
    }

    async fn stale_documents(&self, cutoff: DateTime<Utc>) -> Result<Vec<InboxItem>, SiteError> {
        queries::inbox::stale_documents(self.db()?, cutoff).await
    }
}

#[async_trait]
impl EventQueue for SqliteStorage {
    async fn event_exists(&self, dedup_key: &str) -> Result<bool, SiteError> {
        queries::events::exists(self.db()?, dedup_key).await
    }

    async fn enqueue_event(
        &self,
        event: &NewEvent,
        now: DateTime<Utc>,
    ) -> Result<EnqueueOutcome, SiteError> {
        queries::events::enqueue(self.db()?, event, now).await
    }

    async fn pending_events(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<QueuedEvent>, SiteError> {
        queries::events::pending(self.db()?, now, limit).await
    }

    async fn mark_event_sent(&self, id: i64, now: DateTime<Utc>) -> Result<bool, SiteError> {
        queries::events::mark_sent(self.db()?, id, now).await
    }

    async fn events_of_type(&self, event_type: EventType) -> Result<Vec<QueuedEvent>, SiteError> {
        queries::events::of_type(self.db()?, event_type).await
    }
}

#[async_trait]
impl ApprovalStore for SqliteStorage {
    async fn create_approval(
        &self,
        approval: &NewApproval,
        now: DateTime<Utc>,
    ) -> Result<i64, SiteError> {
        queries::approvals::create(self.db()?, approval, now).await
    }

    async fn get_approval(&self, id: i64) -> Result<Option<Approval>, SiteError> {
        queries::approvals::get(self.db()?, id).await
    }

    async fn pending_approvals(
        &self,
        scope: Option<&[String]>,
        limit: usize,
    ) -> Result<Vec<Approval>, SiteError> {
        queries::approvals::pending(self.db()?, scope, limit).await
    }

    async fn decide_approval(
        &self,
        id: i64,
        decision: Decision,
        decided_by: &str,
        now: DateTime<Utc>,
    ) -> Result<DecisionOutcome, SiteError> {
        queries::approvals::decide(self.db()?, id, decision, decided_by, now).await
    }
}

#[async_trait]
impl SiteStore for SqliteStorage {
    async fn active_projects(&self, scope: Option<&[String]>) -> Result<Vec<Project>, SiteError> {
        queries::projects::active(self.db()?, scope).await
    }

    async fn get_project(&self, id: &str) -> Result<Option<Project>, SiteError> {
        queries::projects::get(self.db()?, id).await
    }

    async fn project_progress(&self, id: &str) -> Result<Option<ProjectProgress>, SiteError> {
        queries::projects::progress(self.db()?, id).await
    }

    async fn facades(&self, project_id: &str) -> Result<Vec<Facade>, SiteError> {
        queries::projects::facades(self.db()?, project_id).await
    }

    async fn floors(&self, facade_id: &str) -> Result<Vec<Floor>, SiteError> {
        queries::projects::floors(self.db()?, facade_id).await
    }

    async fn get_floor(&self, id: &str) -> Result<Option<Floor>, SiteError> {
        queries::projects::floor(self.db()?, id).await
    }

    async fn tasks_for_user(&self, user_id: &str) -> Result<Vec<Task>, SiteError> {
        queries::tasks::for_user(self.db()?, user_id).await
    }

    async fn get_task(&self, id: i64) -> Result<Option<Task>, SiteError> {
        queries::tasks::get(self.db()?, id).await
    }

    async fn set_task_status(
        &self,
        id: i64,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<Task, SiteError> {
        queries::tasks::set_status(self.db()?, id, status, now).await
    }

    async fn tasks_due_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<AssignedTask>, SiteError> {
        queries::tasks::due_between(self.db()?, from, until).await
    }

    async fn overdue_tasks(&self, now: DateTime<Utc>) -> Result<Vec<AssignedTask>, SiteError> {
        queries::tasks::overdue(self.db()?, now).await
    }

    async fn mark_reminder_sent(&self, task_id: i64) -> Result<bool, SiteError> {
        queries::tasks::mark_reminder_sent(self.db()?, task_id).await
    }

    async fn open_alerts(
        &self,
        scope: Option<&[String]>,
        limit: usize,
    ) -> Result<Vec<Alert>, SiteError> {
        queries::alerts::open(self.db()?, scope, limit).await
    }

    async fn alerts_open_since(
        &self,
        project_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Alert>, SiteError> {
        queries::alerts::open_since(self.db()?, project_id, cutoff).await
    }

    async fn get_alert(&self, id: i64) -> Result<Option<Alert>, SiteError> {
        queries::alerts::get(self.db()?, id).await
    }

    async fn resolve_alert(
        &self,
        id: i64,
        resolved_by: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, SiteError> {
        queries::alerts::resolve(self.db()?, id, resolved_by, now).await
    }

    async fn material_deficits(
        &self,
        project_id: &str,
    ) -> Result<Vec<MaterialDeficit>, SiteError> {
        queries::supply::material_deficits(self.db()?, project_id).await
    }

    async fn open_orders(&self, project_id: &str) -> Result<Vec<OpenOrder>, SiteError> {
        queries::supply::open_orders(self.db()?, project_id).await
    }

    async fn fact_summary(
        &self,
        project_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<FactSummary, SiteError> {
        queries::projects::fact_summary(self.db()?, project_id, from, to).await
    }

    async fn has_report(
        &self,
        project_id: &str,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<bool, SiteError> {
        queries::projects::has_report(self.db()?, project_id, user_id, date).await
    }

    async fn pending_stages(
        &self,
        scope: Option<&[String]>,
        limit: usize,
    ) -> Result<Vec<StageAcceptance>, SiteError> {
        queries::stages::pending(self.db()?, scope, limit).await
    }

    async fn get_stage(&self, id: i64) -> Result<Option<StageAcceptance>, SiteError> {
        queries::stages::get(self.db()?, id).await
    }

    async fn decide_stage(
        &self,
        id: i64,
        verdict: Verdict,
        inspector_id: &str,
        now: DateTime<Utc>,
    ) -> Result<StageOutcome, SiteError> {
        debug!(stage_id = id, ?verdict, "deciding stage");
        queries::stages::decide(self.db()?, id, verdict, inspector_id, now).await
    }

    async fn stage_history(
        &self,
        inspector_id: &str,
        limit: usize,
    ) -> Result<Vec<StageAcceptance>, SiteError> {
        queries::stages::history(self.db()?, inspector_id, limit).await
    }

    async fn submit_document(
        &self,
        doc: &DocumentSubmission,
        now: DateTime<Utc>,
    ) -> Result<i64, SiteError> {
        queries::submissions::document(self.db()?, doc, now).await
    }

    async fn submit_photos(
        &self,
        batch: &PhotoSubmission,
        now: DateTime<Utc>,
    ) -> Result<i64, SiteError> {
        queries::submissions::photos(self.db()?, batch, now).await
    }

    async fn submit_daily_log(
        &self,
        log: &DailyLogSubmission,
        now: DateTime<Utc>,
    ) -> Result<i64, SiteError> {
        queries::submissions::daily_log(self.db()?, log, now).await
    }

    async fn submit_alert(
        &self,
        alert: &AlertSubmission,
        now: DateTime<Utc>,
    ) -> Result<i64, SiteError> {
        queries::submissions::alert(self.db()?, alert, now).await
    }

    async fn submit_report(
        &self,
        report: &ReportSubmission,
        now: DateTime<Utc>,
    ) -> Result<FloorProgress, SiteError> {
        queries::submissions::report(self.db()?, report, now).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use tempfile::tempdir;

    fn config(dir: &tempfile::TempDir) -> StorageConfig {
        StorageConfig {
            database_path: dir.path().join("site.db").to_string_lossy().into_owned(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn uninitialized_storage_reports_error() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(config(&dir));
        assert!(storage.get_project("p1").await.is_err());
        assert!(matches!(
            storage.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
    }

    #[tokio::test]
    async fn initialize_twice_is_rejected() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(config(&dir));
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
        assert!(storage.initialize().await.is_err());
        storage.close().await.unwrap();
    }

    #[tokio::test]
    async fn usable_as_trait_object() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(config(&dir));
        storage.initialize().await.unwrap();
        let storage: Arc<dyn StorageAdapter> = Arc::new(storage);
        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
        assert!(storage.active_projects(None).await.unwrap().is_empty());
        assert_eq!(storage.count_unread(None, &[Role::Pm]).await.unwrap(), 0);
        assert!(storage.pending_stages(None, 10).await.unwrap().is_empty());
        storage.shutdown().await.unwrap();
    }
}
