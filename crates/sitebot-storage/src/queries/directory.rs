// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity resolution from `profiles` and `user_roles`.

use rusqlite::{Connection, OptionalExtension, params};
use sitebot_core::SiteError;
use sitebot_core::records::ForemanOnDuty;
use sitebot_core::types::{Identity, NotificationPreferences, Role, RoleGrant};
use tracing::debug;

use crate::database::{Database, map_tr_err, to_json};

fn load_identity(
    conn: &Connection,
    column: &str,
    key: &dyn rusqlite::ToSql,
) -> rusqlite::Result<Option<Identity>> {
    let sql = format!(
        "SELECT user_id, display_name, telegram_chat_id, notification_preferences
         FROM profiles WHERE {column} = ?1"
    );
    let profile = conn
        .query_row(&sql, [key], |row| {
            let prefs: String = row.get(3)?;
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i64>>(2)?,
                prefs,
            ))
        })
        .optional()?;

    let Some((user_id, display_name, chat_id, prefs)) = profile else {
        return Ok(None);
    };
    // Profiles without a chat binding cannot be reached and are treated as unknown.
    let Some(chat_id) = chat_id else {
        return Ok(None);
    };

    let mut stmt =
        conn.prepare("SELECT role, project_id FROM user_roles WHERE user_id = ?1 ORDER BY id")?;
    let grants = stmt
        .query_map(params![user_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?
        .into_iter()
        .filter_map(|(tag, project_id)| match Role::parse_tag(&tag) {
            Some(role) => Some(RoleGrant { role, project_id }),
            None => {
                debug!(user_id = %user_id, tag = %tag, "ignoring unknown role tag");
                None
            }
        })
        .collect();

    Ok(Some(Identity {
        user_id,
        display_name,
        chat_id,
        grants,
        // Malformed preference JSON falls back to defaults rather than locking the user out.
        preferences: serde_json::from_str(&prefs).unwrap_or_default(),
    }))
}

pub async fn identity_by_chat(db: &Database, chat_id: i64) -> Result<Option<Identity>, SiteError> {
    db.connection()
        .call(move |conn| load_identity(conn, "telegram_chat_id", &chat_id))
        .await
        .map_err(map_tr_err)
}

pub async fn identity_by_user(db: &Database, user_id: &str) -> Result<Option<Identity>, SiteError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| load_identity(conn, "user_id", &user_id))
        .await
        .map_err(map_tr_err)
}

pub async fn update_preferences(
    db: &Database,
    user_id: &str,
    preferences: &NotificationPreferences,
) -> Result<(), SiteError> {
    let owned_id = user_id.to_string();
    let prefs = to_json(preferences)?;
    let updated = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE profiles SET notification_preferences = ?2 WHERE user_id = ?1",
                params![owned_id, prefs],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if updated == 0 {
        return Err(SiteError::not_found("profile", user_id));
    }
    Ok(())
}

/// Foremen granted on the project, either directly or through an unscoped grant.
pub async fn foremen_for_project(
    db: &Database,
    project_id: &str,
) -> Result<Vec<ForemanOnDuty>, SiteError> {
    let project_id = project_id.to_string();
    let rows = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT p.user_id, p.display_name, p.telegram_chat_id,
                        p.notification_preferences
                 FROM profiles p
                 JOIN user_roles r ON r.user_id = p.user_id
                 WHERE r.role IN ('foreman1', 'foreman2', 'foreman3')
                   AND (r.project_id IS NULL OR r.project_id = ?1)
                 ORDER BY p.display_name, p.user_id",
            )?;
            let rows = stmt.query_map(params![project_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .await
        .map_err(map_tr_err)?;

    Ok(rows
        .into_iter()
        .map(|(user_id, display_name, chat_id, prefs)| {
            let prefs: NotificationPreferences = serde_json::from_str(&prefs).unwrap_or_default();
            ForemanOnDuty {
                user_id,
                display_name,
                chat_id,
                report_reminders: prefs.report_reminders,
            }
        })
        .collect())
}
