// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Site alerts. Resolution is one-way.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use sitebot_core::SiteError;
use sitebot_core::records::Alert;

use crate::database::{Database, enum_col, fmt_ts, map_tr_err, opt_ts_col, to_json, ts_col};

const ALERT_COLUMNS: &str =
    "id, project_id, title, description, priority, is_resolved, created_by, created_at, resolved_at";

pub(crate) fn row_to_alert(row: &rusqlite::Row<'_>) -> rusqlite::Result<Alert> {
    Ok(Alert {
        id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        priority: enum_col(row, 4)?,
        is_resolved: row.get(5)?,
        created_by: row.get(6)?,
        created_at: ts_col(row, 7)?,
        resolved_at: opt_ts_col(row, 8)?,
    })
}

/// Unresolved alerts, most severe first, then newest.
pub async fn open(
    db: &Database,
    scope: Option<&[String]>,
    limit: usize,
) -> Result<Vec<Alert>, SiteError> {
    let scope = scope.map(to_json).transpose()?;
    let limit = limit as i64;
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {ALERT_COLUMNS} FROM alerts
                 WHERE is_resolved = 0
                   AND (?1 IS NULL OR project_id IN (SELECT value FROM json_each(?1)))
                 ORDER BY CASE priority
                     WHEN 'critical' THEN 0 WHEN 'high' THEN 1
                     WHEN 'normal' THEN 2 ELSE 3 END,
                   created_at DESC, id DESC
                 LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![scope, limit], row_to_alert)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn open_since(
    db: &Database,
    project_id: &str,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Alert>, SiteError> {
    let project_id = project_id.to_string();
    let cutoff = fmt_ts(&cutoff);
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {ALERT_COLUMNS} FROM alerts
                 WHERE project_id = ?1 AND is_resolved = 0 AND created_at < ?2
                 ORDER BY created_at ASC, id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![project_id, cutoff], row_to_alert)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, id: i64) -> Result<Option<Alert>, SiteError> {
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?1");
            conn.query_row(&sql, params![id], row_to_alert).optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Returns `false` when the alert was already resolved.
pub async fn resolve(
    db: &Database,
    id: i64,
    resolved_by: &str,
    now: DateTime<Utc>,
) -> Result<bool, SiteError> {
    let resolved_by = resolved_by.to_string();
    let now = fmt_ts(&now);
    let (changed, found) = db
        .connection()
        .call(move |conn| -> Result<(usize, bool), rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE alerts SET is_resolved = 1, resolved_at = ?2, resolved_by = ?3
                 WHERE id = ?1 AND is_resolved = 0",
                params![id, now, resolved_by],
            )?;
            let found: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM alerts WHERE id = ?1)",
                params![id],
                |row| row.get(0),
            )?;
            Ok((changed, found))
        })
        .await
        .map_err(map_tr_err)?;
    if !found {
        return Err(SiteError::not_found("alert", id));
    }
    Ok(changed == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use sitebot_core::types::Priority;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch(
                    "INSERT INTO alerts (id, project_id, title, priority, created_at) VALUES
                        (1, 'p1', 'Scaffold loose', 'normal', '2026-03-04T08:00:00.000Z'),
                        (2, 'p1', 'Crane down', 'critical', '2026-03-06T08:00:00.000Z'),
                        (3, 'p2', 'Late delivery', 'high', '2026-03-04T09:00:00.000Z');",
                )
            })
            .await
            .unwrap();
        (db, dir)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 6, 10, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn open_alerts_sort_by_severity() {
        let (db, _dir) = setup_db().await;
        let all = open(&db, None, 10).await.unwrap();
        assert_eq!(all.iter().map(|a| a.id).collect::<Vec<_>>(), vec![2, 3, 1]);
        assert_eq!(all[0].priority, Priority::Critical);

        let scoped = open(&db, Some(&["p2".to_string()]), 10).await.unwrap();
        assert_eq!(scoped.len(), 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_since_uses_cutoff() {
        let (db, _dir) = setup_db().await;
        let stale = open_since(&db, "p1", now() - Duration::hours(24)).await.unwrap();
        assert_eq!(stale.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn resolve_is_one_way() {
        let (db, _dir) = setup_db().await;
        assert!(resolve(&db, 1, "u1", now()).await.unwrap());
        assert!(!resolve(&db, 1, "u2", now()).await.unwrap());

        let alert = get(&db, 1).await.unwrap().unwrap();
        assert!(alert.is_resolved);
        assert_eq!(alert.resolved_at, Some(now()));
        assert!(open_since(&db, "p1", now()).await.unwrap().iter().all(|a| a.id != 1));
        assert!(matches!(
            resolve(&db, 77, "u1", now()).await,
            Err(SiteError::NotFound { .. })
        ));
        db.close().await.unwrap();
    }
}
