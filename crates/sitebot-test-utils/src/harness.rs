// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a temp SQLite store, a recording transport and a
//! manual clock, and offers fixture seeding for the site tables. Higher
//! layers (the dispatcher, the scheduler) are built on top of its parts by
//! the tests themselves.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::params;

use sitebot_config::model::{SiteConfig, StorageConfig};
use sitebot_core::types::{Priority, Role};
use sitebot_core::{SiteError, StorageAdapter};
use sitebot_storage::SqliteStorage;

use crate::clock::ManualClock;
use crate::mock_transport::MockTransport;

fn seed_err(e: impl std::fmt::Display) -> SiteError {
    SiteError::Storage {
        source: format!("fixture seeding failed: {e}").into(),
    }
}

fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    now: DateTime<Utc>,
    config: SiteConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            // Friday 2026-03-06 12:00 at UTC+3.
            now: Utc.with_ymd_and_hms(2026, 3, 6, 9, 0, 0).single().unwrap_or_default(),
            config: SiteConfig::default(),
        }
    }

    /// Start the manual clock at `now`.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Replace the configuration. The storage section is always overridden.
    pub fn with_config(mut self, config: SiteConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the harness, creating and migrating a temp database.
    pub async fn build(self) -> Result<TestHarness, SiteError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| SiteError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            wal_mode: true,
        };

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;

        Ok(TestHarness {
            storage: Arc::new(storage),
            transport: Arc::new(MockTransport::new()),
            clock: Arc::new(ManualClock::new(self.now)),
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    /// Recording transport.
    pub transport: Arc<MockTransport>,
    /// Manual clock shared with everything built from the harness.
    pub clock: Arc<ManualClock>,
    /// Configuration with the storage section pointing at the temp DB.
    pub config: SiteConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// The storage as the trait object the workflow and scheduler consume.
    pub fn store(&self) -> Arc<dyn StorageAdapter> {
        self.storage.clone()
    }

    /// Run raw SQL against the fixture database.
    pub async fn execute(&self, sql: &str) -> Result<(), SiteError> {
        let sql = sql.to_string();
        self.storage
            .db()?
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> { conn.execute_batch(&sql) })
            .await
            .map_err(seed_err)
    }

    /// Evaluate a query returning a single integer.
    pub async fn scalar(&self, sql: &str) -> Result<i64, SiteError> {
        let sql = sql.to_string();
        self.storage
            .db()?
            .connection()
            .call(move |conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(&sql, [], |row| row.get(0))
            })
            .await
            .map_err(seed_err)
    }

    pub async fn seed_project(&self, id: &str, name: &str) -> Result<(), SiteError> {
        let (id, name) = (id.to_string(), name.to_string());
        self.storage
            .db()?
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO projects (id, name, status) VALUES (?1, ?2, 'active')",
                    params![id, name],
                )?;
                Ok(())
            })
            .await
            .map_err(seed_err)
    }

    pub async fn seed_facade(
        &self,
        id: &str,
        project_id: &str,
        name: &str,
    ) -> Result<(), SiteError> {
        let (id, project_id, name) = (id.to_string(), project_id.to_string(), name.to_string());
        self.storage
            .db()?
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO facades (id, project_id, name) VALUES (?1, ?2, ?3)",
                    params![id, project_id, name],
                )?;
                Ok(())
            })
            .await
            .map_err(seed_err)
    }

    pub async fn seed_floor(
        &self,
        id: &str,
        facade_id: &str,
        floor_number: i32,
        modules_plan: i64,
        modules_fact: i64,
    ) -> Result<(), SiteError> {
        let (id, facade_id) = (id.to_string(), facade_id.to_string());
        self.storage
            .db()?
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                let status = if modules_fact > 0 { "in_progress" } else { "pending" };
                conn.execute(
                    "INSERT INTO floors
                        (id, project_id, facade_id, floor_number, modules_plan, modules_fact, status)
                     SELECT ?1, project_id, id, ?2, ?3, ?4, ?5 FROM facades WHERE id = ?6",
                    params![id, floor_number, modules_plan, modules_fact, status, facade_id],
                )?;
                Ok(())
            })
            .await
            .map_err(seed_err)
    }

    /// Create a profile bound to `chat_id` with the given role grants.
    pub async fn seed_user(
        &self,
        user_id: &str,
        display_name: &str,
        chat_id: i64,
        grants: &[(Role, Option<&str>)],
    ) -> Result<(), SiteError> {
        let (user_id, display_name) = (user_id.to_string(), display_name.to_string());
        let grants: Vec<(String, Option<String>)> = grants
            .iter()
            .map(|(role, project)| (role.to_string(), project.map(str::to_string)))
            .collect();
        self.storage
            .db()?
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO profiles (user_id, display_name, telegram_chat_id)
                     VALUES (?1, ?2, ?3)",
                    params![user_id, display_name, chat_id],
                )?;
                for (role, project) in &grants {
                    tx.execute(
                        "INSERT INTO user_roles (user_id, role, project_id) VALUES (?1, ?2, ?3)",
                        params![user_id, role, project],
                    )?;
                }
                tx.commit()
            })
            .await
            .map_err(seed_err)
    }

    /// Insert an open task and return its id.
    pub async fn seed_task(
        &self,
        project_id: &str,
        title: &str,
        assigned_to: Option<&str>,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<i64, SiteError> {
        let (project_id, title) = (project_id.to_string(), title.to_string());
        let assigned_to = assigned_to.map(str::to_string);
        let deadline = deadline.as_ref().map(fmt_ts);
        self.storage
            .db()?
            .connection()
            .call(move |conn| -> Result<i64, rusqlite::Error> {
                conn.execute(
                    "INSERT INTO tasks (project_id, title, assigned_to, deadline, priority)
                     VALUES (?1, ?2, ?3, ?4, 'high')",
                    params![project_id, title, assigned_to, deadline],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(seed_err)
    }

    /// Insert an unresolved alert and return its id.
    pub async fn seed_alert(
        &self,
        project_id: &str,
        title: &str,
        priority: Priority,
        created_at: DateTime<Utc>,
    ) -> Result<i64, SiteError> {
        let (project_id, title) = (project_id.to_string(), title.to_string());
        let priority = priority.to_string();
        let created_at = fmt_ts(&created_at);
        self.storage
            .db()?
            .connection()
            .call(move |conn| -> Result<i64, rusqlite::Error> {
                conn.execute(
                    "INSERT INTO alerts (project_id, title, priority, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![project_id, title, priority, created_at],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(seed_err)
    }

    /// Insert a stage awaiting the inspector and return its id.
    pub async fn seed_stage(
        &self,
        project_id: &str,
        floor_id: Option<&str>,
        stage: &str,
        created_at: DateTime<Utc>,
    ) -> Result<i64, SiteError> {
        let (project_id, stage) = (project_id.to_string(), stage.to_string());
        let floor_id = floor_id.map(str::to_string);
        let created_at = fmt_ts(&created_at);
        self.storage
            .db()?
            .connection()
            .call(move |conn| -> Result<i64, rusqlite::Error> {
                conn.execute(
                    "INSERT INTO stage_acceptance (project_id, facade_id, floor_id, stage, created_at)
                     VALUES (?1, (SELECT facade_id FROM floors WHERE id = ?2), ?2, ?3, ?4)",
                    params![project_id, floor_id, stage, created_at],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(seed_err)
    }
}
