// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session persistence. One row per chat; expiry is evaluated against the caller's clock.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use sitebot_core::SiteError;
use sitebot_core::types::{IDLE_STATE, Session};

use crate::database::{Database, fmt_ts, json_col, map_tr_err, to_json, ts_col};

/// Load a session unless it is missing or expired at `now`.
pub async fn load_session(
    db: &Database,
    chat_id: i64,
    now: DateTime<Utc>,
) -> Result<Option<Session>, SiteError> {
    let now = fmt_ts(&now);
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT chat_id, user_id, state, context, pinned_message_id, expires_at, updated_at
                 FROM bot_sessions
                 WHERE chat_id = ?1 AND expires_at > ?2",
                params![chat_id, now],
                |row| {
                    Ok(Session {
                        chat_id: row.get(0)?,
                        user_id: row.get(1)?,
                        state: row.get(2)?,
                        context: json_col(row, 3)?,
                        pinned_message_id: row.get(4)?,
                        expires_at: ts_col(row, 5)?,
                        updated_at: ts_col(row, 6)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace the full session row.
pub async fn save_session(db: &Database, session: &Session) -> Result<(), SiteError> {
    let context = to_json(&session.context)?;
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO bot_sessions
                    (chat_id, user_id, state, context, pinned_message_id, expires_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(chat_id) DO UPDATE SET
                    user_id = excluded.user_id,
                    state = excluded.state,
                    context = excluded.context,
                    pinned_message_id = excluded.pinned_message_id,
                    expires_at = excluded.expires_at,
                    updated_at = excluded.updated_at",
                params![
                    session.chat_id,
                    session.user_id,
                    session.state,
                    context,
                    session.pinned_message_id,
                    fmt_ts(&session.expires_at),
                    fmt_ts(&session.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Reset to idle with an empty context. The pinned message id survives.
pub async fn clear_session(
    db: &Database,
    chat_id: i64,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<(), SiteError> {
    let now = fmt_ts(&now);
    let expires_at = fmt_ts(&expires_at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE bot_sessions
                 SET state = ?2, context = '{}', expires_at = ?3, updated_at = ?4
                 WHERE chat_id = ?1",
                params![chat_id, IDLE_STATE, expires_at, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete sessions that expired before `cutoff`.
pub async fn purge_expired(db: &Database, cutoff: DateTime<Utc>) -> Result<usize, SiteError> {
    let cutoff = fmt_ts(&cutoff);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM bot_sessions WHERE expires_at < ?1",
                params![cutoff],
            )
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 6, hour, 0, 0).unwrap()
    }

    fn session(chat_id: i64, now: DateTime<Utc>) -> Session {
        Session {
            chat_id,
            user_id: Some("u1".into()),
            state: "report:floor".into(),
            context: serde_json::json!({"flow": "report", "facade_id": "fa"}),
            pinned_message_id: Some(77),
            expires_at: now + Duration::hours(8),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let (db, _dir) = setup_db().await;
        save_session(&db, &session(1, at(9))).await.unwrap();

        let loaded = load_session(&db, 1, at(10)).await.unwrap().unwrap();
        assert_eq!(loaded, session(1, at(9)));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn expired_session_reads_as_absent() {
        let (db, _dir) = setup_db().await;
        save_session(&db, &session(1, at(1))).await.unwrap();

        // Expires exactly at 09:00; a read at that instant sees nothing.
        assert!(load_session(&db, 1, at(8)).await.unwrap().is_some());
        assert!(load_session(&db, 1, at(9)).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn clear_keeps_pinned_message() {
        let (db, _dir) = setup_db().await;
        save_session(&db, &session(1, at(9))).await.unwrap();
        clear_session(&db, 1, at(10), at(18)).await.unwrap();

        let loaded = load_session(&db, 1, at(10)).await.unwrap().unwrap();
        assert_eq!(loaded.state, IDLE_STATE);
        assert_eq!(loaded.context, serde_json::json!({}));
        assert_eq!(loaded.pinned_message_id, Some(77));
        assert_eq!(loaded.expires_at, at(18));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn purge_removes_only_expired_rows() {
        let (db, _dir) = setup_db().await;
        save_session(&db, &session(1, at(0))).await.unwrap();
        save_session(&db, &session(2, at(12))).await.unwrap();

        let removed = purge_expired(&db, at(12)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(load_session(&db, 2, at(13)).await.unwrap().is_some());
        db.close().await.unwrap();
    }
}
