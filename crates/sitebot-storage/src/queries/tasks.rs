// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task queries, including the deadline reminder marker.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use sitebot_core::SiteError;
use sitebot_core::records::{AssignedTask, Task, TaskStatus};
use sitebot_core::types::NotificationPreferences;

use crate::database::{Database, enum_col, fmt_ts, map_tr_err, opt_ts_col};

const TASK_COLUMNS: &str = "t.id, t.project_id, t.title, t.description, t.status, t.priority,
    t.assigned_to, t.assigned_role, t.deadline, t.reminder_sent";

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let assigned_role: Option<String> = row.get(7)?;
    Ok(Task {
        id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: enum_col(row, 4)?,
        priority: enum_col(row, 5)?,
        assigned_to: row.get(6)?,
        assigned_role: assigned_role.as_deref().and_then(sitebot_core::Role::parse_tag),
        deadline: opt_ts_col(row, 8)?,
        reminder_sent: row.get(9)?,
    })
}

/// Task columns followed by the assignee's chat id and preference JSON.
fn row_to_assigned(row: &rusqlite::Row<'_>) -> rusqlite::Result<AssignedTask> {
    let prefs: Option<String> = row.get(11)?;
    let prefs: NotificationPreferences = prefs
        .and_then(|p| serde_json::from_str(&p).ok())
        .unwrap_or_default();
    Ok(AssignedTask {
        task: row_to_task(row)?,
        assignee_chat_id: row.get(10)?,
        deadline_warnings: prefs.deadline_warnings,
    })
}

pub async fn for_user(db: &Database, user_id: &str) -> Result<Vec<Task>, SiteError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {TASK_COLUMNS} FROM tasks t
                 WHERE t.assigned_to = ?1 AND t.status != 'done'
                 ORDER BY t.deadline IS NULL, t.deadline, t.id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![user_id], row_to_task)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, id: i64) -> Result<Option<Task>, SiteError> {
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = ?1");
            conn.query_row(&sql, params![id], row_to_task).optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_status(
    db: &Database,
    id: i64,
    status: TaskStatus,
    now: DateTime<Utc>,
) -> Result<Task, SiteError> {
    let status = status.to_string();
    let now = fmt_ts(&now);
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE tasks SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, status, now],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(SiteError::not_found("task", id));
    }
    get(db, id)
        .await?
        .ok_or_else(|| SiteError::not_found("task", id))
}

async fn assigned_where(
    db: &Database,
    condition: &'static str,
    bounds: (String, Option<String>),
) -> Result<Vec<AssignedTask>, SiteError> {
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {TASK_COLUMNS}, p.telegram_chat_id, p.notification_preferences
                 FROM tasks t
                 LEFT JOIN profiles p ON p.user_id = t.assigned_to
                 WHERE t.status != 'done' AND t.deadline IS NOT NULL AND {condition}
                 ORDER BY t.deadline, t.id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![bounds.0, bounds.1], row_to_assigned)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn due_between(
    db: &Database,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Vec<AssignedTask>, SiteError> {
    assigned_where(
        db,
        "t.reminder_sent = 0 AND t.deadline >= ?1 AND t.deadline <= ?2",
        (fmt_ts(&from), Some(fmt_ts(&until))),
    )
    .await
}

pub async fn overdue(db: &Database, now: DateTime<Utc>) -> Result<Vec<AssignedTask>, SiteError> {
    assigned_where(db, "t.deadline < ?1 AND ?2 IS NULL", (fmt_ts(&now), None)).await
}

pub async fn mark_reminder_sent(db: &Database, task_id: i64) -> Result<bool, SiteError> {
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE tasks SET reminder_sent = 1 WHERE id = ?1 AND reminder_sent = 0",
                params![task_id],
            )
        })
        .await
        .map_err(map_tr_err)?;
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
                    "INSERT INTO profiles (user_id, display_name, telegram_chat_id, notification_preferences)
                        VALUES ('u1', 'Ivan', 100, '{\"deadline_warnings\": false}');
                     INSERT INTO tasks (id, project_id, title, status, priority, assigned_to, assigned_role, deadline) VALUES
                        (1, 'p1', 'Order bolts', 'todo', 'high', 'u1', 'supply', '2026-03-06T20:00:00.000Z'),
                        (2, 'p1', 'Check welds', 'in_progress', 'normal', 'u1', NULL, '2026-03-05T08:00:00.000Z'),
                        (3, 'p1', 'Closed', 'done', 'low', 'u1', NULL, '2026-03-05T08:00:00.000Z'),
                        (4, 'p1', 'Far away', 'todo', 'normal', 'u2', NULL, '2026-04-01T08:00:00.000Z');",
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
    async fn user_tasks_skip_done_and_sort_by_deadline() {
        let (db, _dir) = setup_db().await;
        let ids: Vec<i64> = for_user(&db, "u1").await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 1]);

        let task = get(&db, 1).await.unwrap().unwrap();
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.assigned_role, Some(sitebot_core::Role::Supply));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn due_window_and_reminder_marker() {
        let (db, _dir) = setup_db().await;
        let due = due_between(&db, now(), now() + Duration::hours(24)).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].task.id, 1);
        assert_eq!(due[0].assignee_chat_id, Some(100));
        assert!(!due[0].deadline_warnings);

        assert!(mark_reminder_sent(&db, 1).await.unwrap());
        assert!(!mark_reminder_sent(&db, 1).await.unwrap());
        assert!(due_between(&db, now(), now() + Duration::hours(24)).await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn overdue_excludes_done_tasks() {
        let (db, _dir) = setup_db().await;
        let overdue: Vec<i64> = overdue(&db, now()).await.unwrap().into_iter().map(|t| t.task.id).collect();
        assert_eq!(overdue, vec![2]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn status_update_round_trips() {
        let (db, _dir) = setup_db().await;
        let task = set_status(&db, 1, TaskStatus::InProgress, now()).await.unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(set_status(&db, 99, TaskStatus::Done, now()).await.is_err());
        db.close().await.unwrap();
    }
}
