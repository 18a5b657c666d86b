// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Material balances and production orders used by the briefings.

use rusqlite::params;
use sitebot_core::SiteError;
use sitebot_core::records::{MaterialDeficit, OpenOrder};

use crate::database::{Database, map_tr_err, opt_date_col};

pub async fn material_deficits(
    db: &Database,
    project_id: &str,
) -> Result<Vec<MaterialDeficit>, SiteError> {
    let project_id = project_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT project_id, name, unit, required_qty, available_qty FROM materials
                 WHERE project_id = ?1 AND required_qty > available_qty
                 ORDER BY (required_qty - available_qty) DESC, name",
            )?;
            let rows = stmt.query_map(params![project_id], |row| {
                Ok(MaterialDeficit {
                    project_id: row.get(0)?,
                    name: row.get(1)?,
                    unit: row.get(2)?,
                    required: row.get(3)?,
                    available: row.get(4)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn open_orders(db: &Database, project_id: &str) -> Result<Vec<OpenOrder>, SiteError> {
    let project_id = project_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, project_id, title, status, due_date FROM orders
                 WHERE project_id = ?1 AND status != 'done'
                 ORDER BY due_date IS NULL, due_date, id",
            )?;
            let rows = stmt.query_map(params![project_id], |row| {
                Ok(OpenOrder {
                    id: row.get(0)?,
                    project_id: row.get(1)?,
                    title: row.get(2)?,
                    status: row.get(3)?,
                    due_date: opt_date_col(row, 4)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch(
                    "INSERT INTO materials (project_id, name, unit, required_qty, available_qty) VALUES
                        ('p1', 'Brackets', 'pcs', 400, 150),
                        ('p1', 'Sealant', 'l', 20, 25),
                        ('p1', 'Anchors', 'pcs', 100, 90);
                     INSERT INTO orders (project_id, title, status, due_date) VALUES
                        ('p1', 'Cassettes batch 4', 'in_production', '2026-03-10'),
                        ('p1', 'Cassettes batch 3', 'done', '2026-03-01'),
                        ('p1', 'Profiles', 'open', NULL);",
                )
            })
            .await
            .unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn deficits_are_largest_first() {
        let (db, _dir) = setup_db().await;
        let deficits = material_deficits(&db, "p1").await.unwrap();
        assert_eq!(deficits.len(), 2);
        assert_eq!(deficits[0].name, "Brackets");
        assert_eq!(deficits[0].shortfall(), 250.0);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn done_orders_are_hidden() {
        let (db, _dir) = setup_db().await;
        let titles: Vec<String> = open_orders(&db, "p1").await.unwrap().into_iter().map(|o| o.title).collect();
        assert_eq!(titles, vec!["Cassettes batch 4", "Profiles"]);
        db.close().await.unwrap();
    }
}
