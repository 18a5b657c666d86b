// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Approval records. A decision is applied with a conditional update, so only
//! the first decision on a pending row takes effect and is audited.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::json;
use sitebot_core::SiteError;
use sitebot_core::types::{Approval, Decision, DecisionOutcome, NewApproval};

use super::audit;
use crate::database::{Database, enum_col, fmt_ts, map_tr_err, opt_ts_col, to_json, ts_col};

const APPROVAL_COLUMNS: &str = "id, project_id, kind, title, description, level, status,
    assigned_to, requested_by, entity_id, decided_by, decided_at, created_at";

fn row_to_approval(row: &rusqlite::Row<'_>) -> rusqlite::Result<Approval> {
    Ok(Approval {
        id: row.get(0)?,
        project_id: row.get(1)?,
        kind: enum_col(row, 2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        level: row.get(5)?,
        status: enum_col(row, 6)?,
        assigned_to: row.get(7)?,
        requested_by: row.get(8)?,
        entity_id: row.get(9)?,
        decided_by: row.get(10)?,
        decided_at: opt_ts_col(row, 11)?,
        created_at: ts_col(row, 12)?,
    })
}

pub(crate) fn insert_approval(
    conn: &Connection,
    approval: &NewApproval,
    now: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO approvals
            (project_id, kind, title, description, level, status, assigned_to,
             requested_by, entity_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, ?8, ?9)",
        params![
            approval.project_id,
            approval.kind.to_string(),
            approval.title,
            approval.description,
            approval.level,
            approval.assigned_to,
            approval.requested_by,
            approval.entity_id,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn select_approval(conn: &Connection, id: i64) -> rusqlite::Result<Option<Approval>> {
    let sql = format!("SELECT {APPROVAL_COLUMNS} FROM approvals WHERE id = ?1");
    conn.query_row(&sql, params![id], row_to_approval).optional()
}

pub async fn create(
    db: &Database,
    approval: &NewApproval,
    now: DateTime<Utc>,
) -> Result<i64, SiteError> {
    let approval = approval.clone();
    let now = fmt_ts(&now);
    db.connection()
        .call(move |conn| insert_approval(conn, &approval, &now))
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, id: i64) -> Result<Option<Approval>, SiteError> {
    db.connection()
        .call(move |conn| select_approval(conn, id))
        .await
        .map_err(map_tr_err)
}

pub async fn pending(
    db: &Database,
    scope: Option<&[String]>,
    limit: usize,
) -> Result<Vec<Approval>, SiteError> {
    let scope = scope.map(to_json).transpose()?;
    let limit = limit as i64;
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {APPROVAL_COLUMNS} FROM approvals
                 WHERE status = 'pending'
                   AND (?1 IS NULL OR project_id IN (SELECT value FROM json_each(?1)))
                 ORDER BY created_at ASC, id ASC
                 LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![scope, limit], row_to_approval)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a decision if the approval is still pending.
pub async fn decide(
    db: &Database,
    id: i64,
    decision: Decision,
    decided_by: &str,
    now: DateTime<Utc>,
) -> Result<DecisionOutcome, SiteError> {
    let decided_by = decided_by.to_string();
    let status = decision.status().to_string();
    let now = fmt_ts(&now);
    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE approvals SET status = ?2, decided_by = ?3, decided_at = ?4
                 WHERE id = ?1 AND status = 'pending'",
                params![id, status, decided_by, now],
            )?;
            if changed == 1 {
                audit::record(
                    &tx,
                    None,
                    &decided_by,
                    &format!("approval:{status}"),
                    &json!({ "approval_id": id }),
                    &now,
                )?;
            }
            let approval = select_approval(&tx, id)?;
            tx.commit()?;
            Ok(approval.map(|approval| {
                if changed == 1 {
                    DecisionOutcome::Applied(approval)
                } else {
                    DecisionOutcome::AlreadyDecided(approval)
                }
            }))
        })
        .await
        .map_err(map_tr_err)?;
    outcome.ok_or_else(|| SiteError::not_found("approval", id))
}
