// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbox ledger. Status only moves forward: new, read, processed.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::json;
use sitebot_core::SiteError;
use sitebot_core::types::{InboxItem, InboxKind, InboxStatus, NewInboxItem, Role};

use super::audit;
use crate::database::{Database, enum_col, fmt_ts, json_col, map_tr_err, to_json, ts_col};

const INBOX_COLUMNS: &str = "id, project_id, from_role, from_user_id, to_roles, kind, title,
    description, file_reference, status, created_at, updated_at";

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<InboxItem> {
    Ok(InboxItem {
        id: row.get(0)?,
        project_id: row.get(1)?,
        from_role: enum_col(row, 2)?,
        from_user_id: row.get(3)?,
        to_roles: json_col(row, 4)?,
        kind: enum_col(row, 5)?,
        title: row.get(6)?,
        description: row.get(7)?,
        file_reference: row.get(8)?,
        status: enum_col(row, 9)?,
        created_at: ts_col(row, 10)?,
        updated_at: ts_col(row, 11)?,
    })
}

/// Insert one item inside an open connection or transaction.
pub(crate) fn insert_item(
    conn: &Connection,
    item: &NewInboxItem,
    to_roles_json: &str,
    now: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO bot_inbox
            (project_id, from_role, from_user_id, to_roles, kind, title, description,
             file_reference, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'new', ?9, ?9)",
        params![
            item.project_id,
            item.from_role.to_string(),
            item.from_user_id,
            to_roles_json,
            item.kind.to_string(),
            item.title,
            item.description,
            item.file_reference,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Pre-serialized fan-out: one `(item, to_roles JSON)` pair per recipient.
pub(crate) fn prepare_fan_out(
    item: NewInboxItem,
    recipients: &[Role],
) -> Result<Vec<(NewInboxItem, String)>, SiteError> {
    item.fan_out(recipients)
        .into_iter()
        .map(|item| {
            let roles = to_json(&item.to_roles)?;
            Ok((item, roles))
        })
        .collect()
}

pub async fn post(
    db: &Database,
    item: &NewInboxItem,
    now: DateTime<Utc>,
) -> Result<i64, SiteError> {
    if item.to_roles.is_empty() {
        return Err(SiteError::Validation(
            "inbox item needs at least one recipient role".into(),
        ));
    }
    let roles = to_json(&item.to_roles)?;
    let item = item.clone();
    let now = fmt_ts(&now);
    db.connection()
        .call(move |conn| insert_item(conn, &item, &roles, &now))
        .await
        .map_err(map_tr_err)
}

fn role_tags(roles: &[Role]) -> Result<String, SiteError> {
    to_json(&roles.iter().map(|r| r.to_string()).collect::<Vec<_>>())
}

/// Matches items on a project in the `?2` JSON scope; `NULL` scope or an
/// item without a project always matches.
const SCOPE_FILTER: &str =
    "(?2 IS NULL OR project_id IS NULL OR project_id IN (SELECT value FROM json_each(?2)))";

/// Items whose recipients intersect `roles` within `scope`, newest first.
pub async fn list_for(
    db: &Database,
    scope: Option<&[String]>,
    roles: &[Role],
    limit: usize,
) -> Result<Vec<InboxItem>, SiteError> {
    let roles = role_tags(roles)?;
    let scope = scope.map(to_json).transpose()?;
    let limit = limit as i64;
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {INBOX_COLUMNS} FROM bot_inbox
                 WHERE EXISTS (
                     SELECT 1 FROM json_each(bot_inbox.to_roles) r
                     WHERE r.value IN (SELECT value FROM json_each(?1))
                 )
                   AND {SCOPE_FILTER}
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![roles, scope, limit], row_to_item)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, id: i64) -> Result<Option<InboxItem>, SiteError> {
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {INBOX_COLUMNS} FROM bot_inbox WHERE id = ?1");
            conn.query_row(&sql, params![id], row_to_item).optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Move an item forward to `target`; a request to go backwards leaves it unchanged.
///
/// The step into `processed` is audited under `by`.
pub async fn advance(
    db: &Database,
    id: i64,
    target: InboxStatus,
    by: &str,
    now: DateTime<Utc>,
) -> Result<InboxStatus, SiteError> {
    let by = by.to_string();
    let now = fmt_ts(&now);
    let current = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let current: Option<String> = tx
                .query_row(
                    "SELECT status FROM bot_inbox WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(current) = current else {
                return Ok(None);
            };
            let current: InboxStatus = current.parse().unwrap_or(InboxStatus::New);
            let next = current.max(target);
            if next != current {
                tx.execute(
                    "UPDATE bot_inbox SET status = ?2, updated_at = ?3 WHERE id = ?1",
                    params![id, next.to_string(), now],
                )?;
                if next == InboxStatus::Processed {
                    audit::record(
                        &tx,
                        None,
                        &by,
                        "inbox:processed",
                        &json!({ "inbox_id": id }),
                        &now,
                    )?;
                }
            }
            tx.commit()?;
            Ok(Some(next))
        })
        .await
        .map_err(map_tr_err)?;
    current.ok_or_else(|| SiteError::not_found("inbox item", id))
}

pub async fn count_unread(
    db: &Database,
    scope: Option<&[String]>,
    roles: &[Role],
) -> Result<i64, SiteError> {
    let roles = role_tags(roles)?;
    let scope = scope.map(to_json).transpose()?;
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT COUNT(*) FROM bot_inbox
                 WHERE status = 'new'
                   AND EXISTS (
                       SELECT 1 FROM json_each(bot_inbox.to_roles) r
                       WHERE r.value IN (SELECT value FROM json_each(?1))
                   )
                   AND {SCOPE_FILTER}"
            );
            conn.query_row(&sql, params![roles, scope], |row| row.get(0))
        })
        .await
        .map_err(map_tr_err)
}

/// Unopened document items created before `cutoff`, oldest first.
pub async fn stale_documents(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<Vec<InboxItem>, SiteError> {
    let cutoff = fmt_ts(&cutoff);
    let kind = InboxKind::Document.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {INBOX_COLUMNS} FROM bot_inbox
                 WHERE kind = ?1 AND status = 'new' AND created_at < ?2
                 ORDER BY created_at ASC, id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![kind, cutoff], row_to_item)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
