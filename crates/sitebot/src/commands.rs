// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot subcommands: `tick`, `migrate` and `config`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sitebot_config::SiteConfig;
use sitebot_core::types::EventType;
use sitebot_core::{Clock, SiteError, StorageAdapter, SystemClock};
use sitebot_scheduler::{Scheduler, TickReport};
use tracing::{info, warn};

use crate::serve::open_storage;

const REDACTED: &str = "[redacted]";

/// Run one scheduler tick against the configured database.
pub async fn run_tick(
    config: &SiteConfig,
    at: Option<DateTime<Utc>>,
    rule: Option<EventType>,
) -> Result<TickReport, SiteError> {
    let storage = open_storage(config).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let scheduler = Scheduler::new(storage.clone(), clock, config.scheduler.clone())?;

    let at = at.unwrap_or_else(|| scheduler.now());
    let report = scheduler.run_tick(at, rule).await;
    if report.has_errors() {
        warn!(local_time = %report.local_time, "tick finished with rule errors");
    }
    storage.close().await?;
    Ok(report)
}

/// Open the database, which applies any pending migrations, and close it.
pub async fn run_migrate(config: &SiteConfig) -> Result<(), SiteError> {
    let storage = open_storage(config).await?;
    storage.close().await?;
    info!(path = %config.storage.database_path, "database schema is up to date");
    Ok(())
}

/// The effective configuration as TOML, with secrets masked.
pub fn render_config(config: &SiteConfig) -> Result<String, SiteError> {
    let mut shown = config.clone();
    let mask = |secret: &mut Option<String>| {
        if secret.is_some() {
            *secret = Some(REDACTED.to_string());
        }
    };
    mask(&mut shown.telegram.bot_token);
    mask(&mut shown.telegram.webhook_secret);
    mask(&mut shown.gateway.scheduler_token);
    toml::to_string_pretty(&shown)
        .map_err(|e| SiteError::Internal(format!("failed to render configuration: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitebot_config::model::StorageConfig;
    use tempfile::tempdir;

    fn config_in(dir: &tempfile::TempDir) -> SiteConfig {
        SiteConfig {
            storage: StorageConfig {
                database_path: dir.path().join("site.db").display().to_string(),
                ..StorageConfig::default()
            },
            ..SiteConfig::default()
        }
    }

    #[test]
    fn secrets_are_masked() {
        let mut config = SiteConfig::default();
        config.telegram.bot_token = Some("123:ABC".into());
        config.gateway.scheduler_token = Some("tick-token".into());
        let rendered = render_config(&config).unwrap();
        assert!(!rendered.contains("123:ABC"));
        assert!(!rendered.contains("tick-token"));
        assert!(rendered.contains(REDACTED));
        assert!(rendered.contains("[scheduler]"));
    }

    #[tokio::test]
    async fn migrate_creates_the_schema() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir);
        run_migrate(&config).await.unwrap();
        assert!(dir.path().join("site.db").exists());
        // A second run finds nothing to apply.
        run_migrate(&config).await.unwrap();
    }

    #[tokio::test]
    async fn tick_on_an_empty_database_enqueues_nothing() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir);
        let at = "2026-03-06T14:00:00Z".parse().unwrap();
        let report = run_tick(&config, Some(at), None).await.unwrap();
        assert_eq!(report.local_time, "2026-03-06 17:00");
        assert_eq!(report.total_enqueued(), 0);
        assert!(!report.has_errors());
    }

    #[tokio::test]
    async fn named_rule_runs_alone() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir);
        let report = run_tick(&config, None, Some(EventType::DirectorDigest))
            .await
            .unwrap();
        assert_eq!(report.rules.len(), 1);
        assert_eq!(report.rules[0].rule, EventType::DirectorDigest);
    }
}
