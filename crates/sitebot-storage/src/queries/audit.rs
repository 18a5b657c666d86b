// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only audit trail. Rows are written inside the transaction of the
//! action they describe and are never updated.

use rusqlite::{Connection, params};
use serde_json::Value;

pub(crate) fn record(
    conn: &Connection,
    chat_id: Option<i64>,
    user_id: &str,
    action: &str,
    payload: &Value,
    now: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO bot_audit_log (chat_id, user_id, action, payload, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![chat_id, user_id, action, payload.to_string(), now],
    )?;
    Ok(())
}
