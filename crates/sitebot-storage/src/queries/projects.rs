// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Projects, facades, floors, and plan/fact roll-ups.

use chrono::NaiveDate;
use rusqlite::{OptionalExtension, params};
use sitebot_core::SiteError;
use sitebot_core::records::{Facade, FactSummary, Floor, Project, ProjectProgress};

use crate::database::{Database, enum_col, fmt_date, map_tr_err, opt_date_col, to_json};

fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        status: row.get(3)?,
        end_date: opt_date_col(row, 4)?,
    })
}

pub(crate) fn row_to_floor(row: &rusqlite::Row<'_>) -> rusqlite::Result<Floor> {
    Ok(Floor {
        id: row.get(0)?,
        project_id: row.get(1)?,
        facade_id: row.get(2)?,
        floor_number: row.get(3)?,
        modules_plan: row.get(4)?,
        modules_fact: row.get(5)?,
        status: enum_col(row, 6)?,
    })
}

pub(crate) const FLOOR_COLUMNS: &str =
    "id, project_id, facade_id, floor_number, modules_plan, modules_fact, status";

/// Active projects, optionally restricted to a set of ids, ordered by name.
pub async fn active(db: &Database, scope: Option<&[String]>) -> Result<Vec<Project>, SiteError> {
    let scope = scope.map(to_json).transpose()?;
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, code, status, end_date FROM projects
                 WHERE status = 'active'
                   AND (?1 IS NULL OR id IN (SELECT value FROM json_each(?1)))
                 ORDER BY name, id",
            )?;
            let rows = stmt.query_map(params![scope], row_to_project)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, id: &str) -> Result<Option<Project>, SiteError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, name, code, status, end_date FROM projects WHERE id = ?1",
                params![id],
                row_to_project,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn progress(db: &Database, id: &str) -> Result<Option<ProjectProgress>, SiteError> {
    let Some(project) = get(db, id).await? else {
        return Ok(None);
    };
    let id = id.to_string();
    let (modules_plan, modules_fact, open_alerts, open_tasks) = db
        .connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT
                    (SELECT COALESCE(SUM(modules_plan), 0) FROM floors WHERE project_id = ?1),
                    (SELECT COALESCE(SUM(modules_fact), 0) FROM floors WHERE project_id = ?1),
                    (SELECT COUNT(*) FROM alerts WHERE project_id = ?1 AND is_resolved = 0),
                    (SELECT COUNT(*) FROM tasks WHERE project_id = ?1 AND status != 'done')",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(Some(ProjectProgress {
        project,
        modules_plan,
        modules_fact,
        open_alerts,
        open_tasks,
    }))
}

pub async fn facades(db: &Database, project_id: &str) -> Result<Vec<Facade>, SiteError> {
    let project_id = project_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, project_id, name FROM facades
                 WHERE project_id = ?1 ORDER BY sort_order, name",
            )?;
            let rows = stmt.query_map(params![project_id], |row| {
                Ok(Facade {
                    id: row.get(0)?,
                    project_id: row.get(1)?,
                    name: row.get(2)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn floors(db: &Database, facade_id: &str) -> Result<Vec<Floor>, SiteError> {
    let facade_id = facade_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {FLOOR_COLUMNS} FROM floors WHERE facade_id = ?1 ORDER BY floor_number"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![facade_id], row_to_floor)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn floor(db: &Database, id: &str) -> Result<Option<Floor>, SiteError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {FLOOR_COLUMNS} FROM floors WHERE id = ?1");
            conn.query_row(&sql, params![id], row_to_floor).optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn fact_summary(
    db: &Database,
    project_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<FactSummary, SiteError> {
    let project_id = project_id.to_string();
    let (from, to) = (fmt_date(&from), fmt_date(&to));
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT
                    (SELECT COALESCE(SUM(fact_value), 0) FROM plan_fact
                       WHERE project_id = ?1 AND report_date BETWEEN ?2 AND ?3),
                    (SELECT COUNT(*) FROM plan_fact
                       WHERE project_id = ?1 AND report_date BETWEEN ?2 AND ?3),
                    (SELECT COUNT(*) FROM floors WHERE project_id = ?1 AND status = 'done')",
                params![project_id, from, to],
                |row| {
                    Ok(FactSummary {
                        fact_total: row.get(0)?,
                        reports: row.get(1)?,
                        floors_done: row.get(2)?,
                    })
                },
            )
        })
        .await
        .map_err(map_tr_err)
}

/// A progress report or a daily log filed by the user counts as reporting.
pub async fn has_report(
    db: &Database,
    project_id: &str,
    user_id: &str,
    date: NaiveDate,
) -> Result<bool, SiteError> {
    let project_id = project_id.to_string();
    let user_id = user_id.to_string();
    let date = fmt_date(&date);
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM plan_fact
                    WHERE project_id = ?1 AND reported_by = ?2 AND report_date = ?3
                 ) OR EXISTS(
                    SELECT 1 FROM daily_logs
                    WHERE project_id = ?1 AND submitted_by = ?2 AND log_date = ?3
                 )",
                params![project_id, user_id, date],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitebot_core::records::FloorStatus;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch(
                    "INSERT INTO projects (id, name, status) VALUES
                        ('p1', 'Tower', 'active'), ('p2', 'Archive', 'closed'), ('p3', 'Annex', 'active');
                     INSERT INTO facades (id, project_id, name, sort_order) VALUES
                        ('fb', 'p1', 'B', 2), ('fa', 'p1', 'A', 1);
                     INSERT INTO floors (id, project_id, facade_id, floor_number, modules_plan, modules_fact, status) VALUES
                        ('f12', 'p1', 'fa', 12, 20, 5, 'in_progress'),
                        ('f11', 'p1', 'fa', 11, 10, 10, 'done');
                     INSERT INTO plan_fact (project_id, facade_id, floor_id, report_date, fact_value, reported_by, created_at) VALUES
                        ('p1', 'fa', 'f12', '2026-03-06', 5, 'u1', '2026-03-06T10:00:00.000Z');
                     INSERT INTO alerts (project_id, title, priority, created_at) VALUES
                        ('p1', 'Crane', 'high', '2026-03-05T10:00:00.000Z');",
                )
            })
            .await
            .unwrap();
        (db, dir)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[tokio::test]
    async fn active_projects_are_scoped_and_sorted() {
        let (db, _dir) = setup_db().await;
        let all: Vec<String> = active(&db, None).await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(all, vec!["p3", "p1"]);

        let scoped = active(&db, Some(&["p1".to_string(), "p2".to_string()])).await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].name, "Tower");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn progress_rolls_up_floors() {
        let (db, _dir) = setup_db().await;
        let progress = progress(&db, "p1").await.unwrap().unwrap();
        assert_eq!(progress.modules_plan, 30);
        assert_eq!(progress.modules_fact, 15);
        assert_eq!(progress.open_alerts, 1);
        assert_eq!(progress.percent(), 50);
        assert!(super::progress(&db, "nope").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn facades_and_floors_are_ordered() {
        let (db, _dir) = setup_db().await;
        let names: Vec<String> = facades(&db, "p1").await.unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["A", "B"]);

        let floors = floors(&db, "fa").await.unwrap();
        assert_eq!(floors.iter().map(|f| f.floor_number).collect::<Vec<_>>(), vec![11, 12]);
        assert_eq!(floors[0].status, FloorStatus::Done);
        assert_eq!(floor(&db, "f12").await.unwrap().unwrap().modules_fact, 5);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn fact_summary_and_report_presence() {
        let (db, _dir) = setup_db().await;
        let summary = fact_summary(&db, "p1", day(6), day(6)).await.unwrap();
        assert_eq!(summary.fact_total, 5);
        assert_eq!(summary.reports, 1);
        assert_eq!(summary.floors_done, 1);

        assert!(has_report(&db, "p1", "u1", day(6)).await.unwrap());
        assert!(!has_report(&db, "p1", "u1", day(5)).await.unwrap());
        assert!(!has_report(&db, "p1", "u2", day(6)).await.unwrap());
        db.close().await.unwrap();
    }
}
