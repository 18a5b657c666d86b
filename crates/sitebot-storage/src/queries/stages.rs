// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stage acceptance by the technical inspector.
//!
//! A stage leaves `pending_inspector` exactly once, through a conditional
//! update in the same transaction as its audit entry.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::json;
use sitebot_core::SiteError;
use sitebot_core::records::{StageAcceptance, StageOutcome, Verdict};

use super::audit;
use crate::database::{Database, enum_col, fmt_ts, map_tr_err, opt_ts_col, to_json, ts_col};

const STAGE_SELECT: &str = "SELECT s.id, s.project_id, s.facade_id, s.floor_id, s.stage, s.notes,
        s.status, fc.name, fl.floor_number, s.inspector_id, s.inspected_at, s.accepted_at,
        s.created_at
    FROM stage_acceptance s
    LEFT JOIN facades fc ON fc.id = s.facade_id
    LEFT JOIN floors fl ON fl.id = s.floor_id";

fn row_to_stage(row: &rusqlite::Row<'_>) -> rusqlite::Result<StageAcceptance> {
    Ok(StageAcceptance {
        id: row.get(0)?,
        project_id: row.get(1)?,
        facade_id: row.get(2)?,
        floor_id: row.get(3)?,
        stage: row.get(4)?,
        notes: row.get(5)?,
        status: enum_col(row, 6)?,
        facade_name: row.get(7)?,
        floor_number: row.get(8)?,
        inspector_id: row.get(9)?,
        inspected_at: opt_ts_col(row, 10)?,
        accepted_at: opt_ts_col(row, 11)?,
        created_at: ts_col(row, 12)?,
    })
}

fn select_stage(conn: &Connection, id: i64) -> rusqlite::Result<Option<StageAcceptance>> {
    let sql = format!("{STAGE_SELECT} WHERE s.id = ?1");
    conn.query_row(&sql, params![id], row_to_stage).optional()
}

pub async fn pending(
    db: &Database,
    scope: Option<&[String]>,
    limit: usize,
) -> Result<Vec<StageAcceptance>, SiteError> {
    let scope = scope.map(to_json).transpose()?;
    let limit = limit as i64;
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "{STAGE_SELECT}
                 WHERE s.status = 'pending_inspector'
                   AND (?1 IS NULL OR s.project_id IN (SELECT value FROM json_each(?1)))
                 ORDER BY s.created_at DESC, s.id DESC
                 LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![scope, limit], row_to_stage)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, id: i64) -> Result<Option<StageAcceptance>, SiteError> {
    db.connection()
        .call(move |conn| select_stage(conn, id))
        .await
        .map_err(map_tr_err)
}

/// Apply the inspector's verdict if the stage is still pending.
pub async fn decide(
    db: &Database,
    id: i64,
    verdict: Verdict,
    inspector_id: &str,
    now: DateTime<Utc>,
) -> Result<StageOutcome, SiteError> {
    let inspector_id = inspector_id.to_string();
    let status = verdict.status().to_string();
    let accepted_at = (verdict == Verdict::Accept).then(|| fmt_ts(&now));
    let now = fmt_ts(&now);
    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE stage_acceptance
                 SET status = ?2, inspector_id = ?3, inspected_at = ?4, accepted_at = ?5
                 WHERE id = ?1 AND status = 'pending_inspector'",
                params![id, status, inspector_id, now, accepted_at],
            )?;
            if changed == 1 {
                audit::record(
                    &tx,
                    None,
                    &inspector_id,
                    &format!("inspection:{status}"),
                    &json!({ "stage_id": id }),
                    &now,
                )?;
            }
            let stage = select_stage(&tx, id)?;
            tx.commit()?;
            Ok(stage.map(|stage| {
                if changed == 1 {
                    StageOutcome::Applied(stage)
                } else {
                    StageOutcome::AlreadyDecided(stage)
                }
            }))
        })
        .await
        .map_err(map_tr_err)?;
    outcome.ok_or_else(|| SiteError::not_found("stage", id))
}

pub async fn history(
    db: &Database,
    inspector_id: &str,
    limit: usize,
) -> Result<Vec<StageAcceptance>, SiteError> {
    let inspector_id = inspector_id.to_string();
    let limit = limit as i64;
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "{STAGE_SELECT}
                 WHERE s.inspector_id = ?1 AND s.status != 'pending_inspector'
                 ORDER BY s.inspected_at DESC, s.id DESC
                 LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![inspector_id, limit], row_to_stage)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
