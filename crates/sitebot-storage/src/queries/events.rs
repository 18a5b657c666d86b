// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound event queue with per-day idempotency.
//!
//! `dedup_key` carries a UNIQUE constraint, so concurrent scheduler runs
//! cannot enqueue the same event twice even if both pass the existence check.

use chrono::{DateTime, Utc};
use rusqlite::params;
use sitebot_core::SiteError;
use sitebot_core::types::{EnqueueOutcome, EventType, NewEvent, QueuedEvent};

use crate::database::{
    Database, enum_col, fmt_ts, json_col, map_tr_err, opt_ts_col, to_json, ts_col,
};

const EVENT_COLUMNS: &str = "id, event_type, project_id, target_roles, target_users,
    target_chat_ids, priority, payload, status, dedup_key, scheduled_at, created_at, sent_at";

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueuedEvent> {
    Ok(QueuedEvent {
        id: row.get(0)?,
        event_type: enum_col(row, 1)?,
        project_id: row.get(2)?,
        target_roles: json_col(row, 3)?,
        target_users: json_col(row, 4)?,
        target_chat_ids: json_col(row, 5)?,
        priority: enum_col(row, 6)?,
        payload: json_col(row, 7)?,
        status: enum_col(row, 8)?,
        dedup_key: row.get(9)?,
        scheduled_at: ts_col(row, 10)?,
        created_at: ts_col(row, 11)?,
        sent_at: opt_ts_col(row, 12)?,
    })
}

pub async fn exists(db: &Database, dedup_key: &str) -> Result<bool, SiteError> {
    let dedup_key = dedup_key.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM bot_event_queue WHERE dedup_key = ?1)",
                params![dedup_key],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Insert the event unless its dedup key is already taken.
pub async fn enqueue(
    db: &Database,
    event: &NewEvent,
    now: DateTime<Utc>,
) -> Result<EnqueueOutcome, SiteError> {
    if !event.has_targets() {
        return Err(SiteError::Validation(format!(
            "event {} has no targets",
            event.event_type
        )));
    }
    let row = (
        event.event_type.to_string(),
        event.project_id.clone(),
        to_json(&event.target_roles)?,
        to_json(&event.target_users)?,
        to_json(&event.target_chat_ids)?,
        event.priority.to_string(),
        to_json(&event.payload)?,
        event.dedup_key(),
        fmt_ts(&event.scheduled_at),
        fmt_ts(&now),
    );
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO bot_event_queue
                    (event_type, project_id, target_roles, target_users, target_chat_ids,
                     priority, payload, status, dedup_key, scheduled_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8, ?9, ?10)
                 ON CONFLICT(dedup_key) DO NOTHING",
                params![row.0, row.1, row.2, row.3, row.4, row.5, row.6, row.7, row.8, row.9],
            )?;
            Ok(if inserted == 0 {
                EnqueueOutcome::Duplicate
            } else {
                EnqueueOutcome::Inserted(conn.last_insert_rowid())
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Pending events due at `now`, oldest first. Consumed by the delivery worker.
pub async fn pending(
    db: &Database,
    now: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<QueuedEvent>, SiteError> {
    let now = fmt_ts(&now);
    let limit = limit as i64;
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {EVENT_COLUMNS} FROM bot_event_queue
                 WHERE status = 'pending' AND scheduled_at <= ?1
                 ORDER BY scheduled_at ASC, id ASC
                 LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![now, limit], row_to_event)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn mark_sent(db: &Database, id: i64, now: DateTime<Utc>) -> Result<bool, SiteError> {
    let now = fmt_ts(&now);
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE bot_event_queue SET status = 'sent', sent_at = ?2
                 WHERE id = ?1 AND status = 'pending'",
                params![id, now],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(changed == 1)
}

pub async fn of_type(db: &Database, event_type: EventType) -> Result<Vec<QueuedEvent>, SiteError> {
    let event_type = event_type.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {EVENT_COLUMNS} FROM bot_event_queue WHERE event_type = ?1 ORDER BY id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![event_type], row_to_event)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use sitebot_core::types::{EventStatus, Priority, Role};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 6, 14, 0, 0).unwrap()
    }

    fn digest(day: u32) -> NewEvent {
        NewEvent {
            event_type: EventType::DirectorDigest,
            project_id: None,
            subject: None,
            target_roles: vec![Role::Director, Role::Pm],
            target_users: vec![],
            target_chat_ids: vec![],
            priority: Priority::Normal,
            payload: serde_json::json!({"projects": 3}),
            scheduled_at: now(),
            local_date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
        }
    }

    #[tokio::test]
    async fn second_enqueue_for_same_day_is_a_duplicate() {
        let (db, _dir) = setup_db().await;
        let first = enqueue(&db, &digest(6), now()).await.unwrap();
        assert!(matches!(first, EnqueueOutcome::Inserted(_)));
        assert!(exists(&db, &digest(6).dedup_key()).await.unwrap());

        assert_eq!(enqueue(&db, &digest(6), now()).await.unwrap(), EnqueueOutcome::Duplicate);
        assert!(matches!(
            enqueue(&db, &digest(7), now()).await.unwrap(),
            EnqueueOutcome::Inserted(_)
        ));
        assert_eq!(of_type(&db, EventType::DirectorDigest).await.unwrap().len(), 2);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn consumer_reads_pending_and_marks_sent() {
        let (db, _dir) = setup_db().await;
        let EnqueueOutcome::Inserted(id) = enqueue(&db, &digest(6), now()).await.unwrap() else {
            panic!("expected insert");
        };

        let due = pending(&db, now(), 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].target_roles, vec![Role::Director, Role::Pm]);
        assert_eq!(due[0].payload["projects"], 3);
        assert_eq!(due[0].status, EventStatus::Pending);

        assert!(mark_sent(&db, id, now()).await.unwrap());
        assert!(!mark_sent(&db, id, now()).await.unwrap());
        assert!(pending(&db, now(), 10).await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn event_without_targets_is_rejected() {
        let (db, _dir) = setup_db().await;
        let mut event = digest(6);
        event.target_roles.clear();
        assert!(enqueue(&db, &event, now()).await.is_err());
        db.close().await.unwrap();
    }
}
