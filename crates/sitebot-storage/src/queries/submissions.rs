// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flow commit points.
//!
//! Every submission writes its business row, its inbox fan-out, any approval
//! and its audit entry inside one transaction. Nothing is written if any step
//! fails.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use serde_json::json;
use sitebot_core::SiteError;
use sitebot_core::records::{
    AlertSubmission, DailyLogSubmission, DocumentSubmission, Floor, FloorProgress, PhotoSubmission,
    ReportSubmission, Submitter,
};
use sitebot_core::types::{ApprovalKind, InboxKind, NewApproval, NewInboxItem, Role};

use super::approvals::insert_approval;
use super::audit;
use super::inbox::{insert_item, prepare_fan_out};
use super::projects::{FLOOR_COLUMNS, row_to_floor};
use crate::database::{Database, fmt_date, fmt_ts, map_tr_err, to_json};

fn audit_submission(
    conn: &rusqlite::Connection,
    submitter: &Submitter,
    action: &str,
    payload: serde_json::Value,
    now: &str,
) -> rusqlite::Result<()> {
    audit::record(conn, submitter.chat_id, &submitter.user_id, action, &payload, now)
}

fn require_recipients(recipients: &[Role], what: &str) -> Result<(), SiteError> {
    if recipients.is_empty() {
        return Err(SiteError::Validation(format!("{what} needs at least one recipient")));
    }
    Ok(())
}

pub async fn document(
    db: &Database,
    doc: &DocumentSubmission,
    now: DateTime<Utc>,
) -> Result<i64, SiteError> {
    require_recipients(&doc.recipients, "document")?;
    let recipients_json = to_json(&doc.recipients)?;
    let inbox = prepare_fan_out(
        NewInboxItem {
            project_id: Some(doc.project_id.clone()),
            from_role: doc.submitter.role,
            from_user_id: Some(doc.submitter.user_id.clone()),
            to_roles: doc.recipients.clone(),
            kind: InboxKind::Document,
            title: doc.label.clone(),
            description: doc.comment.clone(),
            file_reference: doc.file_reference.clone(),
        },
        &doc.recipients,
    )?;
    let doc = doc.clone();
    let now = fmt_ts(&now);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO documents
                    (project_id, doc_type, recipients, file_reference, comment,
                     sender_role, sender_user_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    doc.project_id,
                    doc.doc_type,
                    recipients_json,
                    doc.file_reference,
                    doc.comment,
                    doc.submitter.role.to_string(),
                    doc.submitter.user_id,
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();
            for (item, roles) in &inbox {
                insert_item(&tx, item, roles, &now)?;
            }
            audit_submission(
                &tx,
                &doc.submitter,
                "doc:sent",
                json!({ "document_id": id, "doc_type": doc.doc_type, "recipients": doc.recipients }),
                &now,
            )?;
            tx.commit()?;
            Ok(id)
        })
        .await
        .map_err(map_tr_err)
}

/// Store a photo batch against its floor and append the files to `floors.photo_urls`.
pub async fn photos(
    db: &Database,
    batch: &PhotoSubmission,
    now: DateTime<Utc>,
) -> Result<i64, SiteError> {
    require_recipients(&batch.recipients, "photo report")?;
    if batch.file_references.is_empty() {
        return Err(SiteError::Validation("photo report needs at least one photo".into()));
    }
    let files_json = to_json(&batch.file_references)?;
    let inbox = prepare_fan_out(
        NewInboxItem {
            project_id: Some(batch.project_id.clone()),
            from_role: batch.submitter.role,
            from_user_id: Some(batch.submitter.user_id.clone()),
            to_roles: batch.recipients.clone(),
            kind: InboxKind::PhotoReport,
            title: String::new(),
            description: batch.caption.clone(),
            file_reference: batch.file_references.first().cloned(),
        },
        &batch.recipients,
    )?;
    let floor_id = batch.floor_id.clone();
    let batch = batch.clone();
    let now = fmt_ts(&now);
    let id = db
        .connection()
        .call(move |conn| -> Result<Option<i64>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let located: Option<(String, i32, String)> = tx
                .query_row(
                    "SELECT fc.name, fl.floor_number, fl.photo_urls
                     FROM floors fl JOIN facades fc ON fc.id = fl.facade_id
                     WHERE fl.id = ?1 AND fl.facade_id = ?2 AND fl.project_id = ?3",
                    params![batch.floor_id, batch.facade_id, batch.project_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;
            let Some((facade_name, floor_number, photo_urls)) = located else {
                return Ok(None);
            };

            tx.execute(
                "INSERT INTO photo_reports
                    (project_id, photo_type, facade_id, floor_id, file_references, caption,
                     created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    batch.project_id,
                    batch.photo_type.to_string(),
                    batch.facade_id,
                    batch.floor_id,
                    files_json,
                    batch.caption,
                    batch.submitter.user_id,
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();

            let mut urls: Vec<String> = serde_json::from_str(&photo_urls).unwrap_or_default();
            urls.extend(batch.file_references.iter().cloned());
            tx.execute(
                "UPDATE floors SET photo_urls = ?2, updated_at = ?3 WHERE id = ?1",
                params![batch.floor_id, json!(urls).to_string(), now],
            )?;

            let title = format!(
                "📸 {} · {facade_name} fl.{floor_number} ({})",
                batch.photo_type.label(),
                batch.file_references.len()
            );
            for (item, roles) in &inbox {
                let item = NewInboxItem {
                    title: title.clone(),
                    ..item.clone()
                };
                insert_item(&tx, &item, roles, &now)?;
            }
            audit_submission(
                &tx,
                &batch.submitter,
                "photo:submit",
                json!({
                    "photo_report_id": id,
                    "photo_type": batch.photo_type,
                    "floor_id": batch.floor_id,
                    "photos": batch.file_references.len(),
                }),
                &now,
            )?;
            tx.commit()?;
            Ok(Some(id))
        })
        .await
        .map_err(map_tr_err)?;
    id.ok_or_else(|| SiteError::not_found("floor", floor_id))
}

pub async fn daily_log(
    db: &Database,
    log: &DailyLogSubmission,
    now: DateTime<Utc>,
) -> Result<i64, SiteError> {
    let title = format!("Daily log {} · {}", log.log_date.format("%d.%m"), log.zone);
    let item = NewInboxItem {
        project_id: Some(log.project_id.clone()),
        from_role: log.submitter.role,
        from_user_id: Some(log.submitter.user_id.clone()),
        to_roles: vec![Role::Pm],
        kind: InboxKind::DailyLog,
        title: title.clone(),
        description: Some(log.works.clone()),
        file_reference: None,
    };
    let item_roles = to_json(&item.to_roles)?;
    let log = log.clone();
    let now = fmt_ts(&now);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO daily_logs
                    (project_id, log_date, zone, works, volume, workers, issues,
                     status, submitted_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'submitted', ?8, ?9)",
                params![
                    log.project_id,
                    fmt_date(&log.log_date),
                    log.zone,
                    log.works,
                    log.volume,
                    log.workers,
                    log.issues,
                    log.submitter.user_id,
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();
            let approval = NewApproval {
                project_id: log.project_id.clone(),
                kind: ApprovalKind::DailyLog,
                title,
                description: log.issues.clone(),
                level: 1,
                assigned_to: None,
                requested_by: Some(log.submitter.user_id.clone()),
                entity_id: Some(id.to_string()),
            };
            insert_approval(&tx, &approval, &now)?;
            insert_item(&tx, &item, &item_roles, &now)?;
            audit_submission(
                &tx,
                &log.submitter,
                "daily_log:submit",
                json!({ "daily_log_id": id, "log_date": fmt_date(&log.log_date) }),
                &now,
            )?;
            tx.commit()?;
            Ok(id)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn alert(
    db: &Database,
    alert: &AlertSubmission,
    now: DateTime<Utc>,
) -> Result<i64, SiteError> {
    require_recipients(&alert.recipients, "alert")?;
    let inbox = prepare_fan_out(
        NewInboxItem {
            project_id: Some(alert.project_id.clone()),
            from_role: alert.submitter.role,
            from_user_id: Some(alert.submitter.user_id.clone()),
            to_roles: alert.recipients.clone(),
            kind: InboxKind::Alert,
            title: format!("{} {}", alert.priority.icon(), alert.title),
            description: alert.description.clone(),
            file_reference: None,
        },
        &alert.recipients,
    )?;
    let alert = alert.clone();
    let now = fmt_ts(&now);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO alerts (project_id, title, description, priority, is_resolved, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6)",
                params![
                    alert.project_id,
                    alert.title,
                    alert.description,
                    alert.priority.to_string(),
                    alert.submitter.user_id,
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();
            for (item, roles) in &inbox {
                insert_item(&tx, item, roles, &now)?;
            }
            audit_submission(
                &tx,
                &alert.submitter,
                "alert:create",
                json!({ "alert_id": id, "priority": alert.priority }),
                &now,
            )?;
            tx.commit()?;
            Ok(id)
        })
        .await
        .map_err(map_tr_err)
}

/// Record a foreman's fact and roll it into the floor's cumulative count.
pub async fn report(
    db: &Database,
    report: &ReportSubmission,
    now: DateTime<Utc>,
) -> Result<FloorProgress, SiteError> {
    if report.value <= 0 {
        return Err(SiteError::Validation(format!(
            "report value must be positive, got {}",
            report.value
        )));
    }
    let pm_roles = to_json(&[Role::Pm])?;
    let floor_id = report.floor_id.clone();
    let report = report.clone();
    let now = fmt_ts(&now);
    let progress = db
        .connection()
        .call(move |conn| -> Result<Option<FloorProgress>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let sql = format!(
                "SELECT {FLOOR_COLUMNS} FROM floors
                 WHERE id = ?1 AND facade_id = ?2 AND project_id = ?3"
            );
            let Some(floor) = tx
                .query_row(
                    &sql,
                    params![report.floor_id, report.facade_id, report.project_id],
                    row_to_floor,
                )
                .optional()?
            else {
                return Ok(None);
            };
            let facade_name: String = tx.query_row(
                "SELECT name FROM facades WHERE id = ?1",
                params![report.facade_id],
                |row| row.get(0),
            )?;

            tx.execute(
                "INSERT INTO plan_fact
                    (project_id, facade_id, floor_id, report_date, plan_value, fact_value,
                     reported_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?7)",
                params![
                    report.project_id,
                    report.facade_id,
                    report.floor_id,
                    fmt_date(&report.report_date),
                    report.value,
                    report.submitter.user_id,
                    now,
                ],
            )?;
            let plan_fact_id = tx.last_insert_rowid();

            let modules_fact = floor.modules_fact + report.value;
            let status = Floor::status_for(modules_fact, floor.modules_plan);
            tx.execute(
                "UPDATE floors SET modules_fact = ?2, status = ?3, updated_at = ?4 WHERE id = ?1",
                params![floor.id, modules_fact, status.to_string(), now],
            )?;

            let item = NewInboxItem {
                project_id: Some(report.project_id.clone()),
                from_role: report.submitter.role,
                from_user_id: Some(report.submitter.user_id.clone()),
                to_roles: vec![Role::Pm],
                kind: InboxKind::Report,
                title: format!(
                    "Facade {facade_name}, floor {}: +{}",
                    floor.floor_number, report.value
                ),
                description: Some(format!("{modules_fact}/{} modules", floor.modules_plan)),
                file_reference: None,
            };
            insert_item(&tx, &item, &pm_roles, &now)?;
            audit_submission(
                &tx,
                &report.submitter,
                "report:submit",
                json!({ "plan_fact_id": plan_fact_id, "floor_id": floor.id, "value": report.value }),
                &now,
            )?;
            tx.commit()?;

            Ok(Some(FloorProgress {
                plan_fact_id,
                floor: Floor {
                    modules_fact,
                    status,
                    ..floor
                },
            }))
        })
        .await
        .map_err(map_tr_err)?;
    progress.ok_or_else(|| SiteError::NotFound {
        entity: "floor",
        id: floor_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use sitebot_core::records::{
        ALERT_RECIPIENTS, FloorStatus, PHOTO_RECIPIENTS, PhotoType, Submitter, document_kind,
    };
    use sitebot_core::types::{ApprovalStatus, Priority};
    use tempfile::tempdir;

    use crate::queries::audit::tests::entries;
    use crate::queries::{approvals, inbox};

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch(
                    "INSERT INTO projects (id, name) VALUES ('p1', 'Tower');
                     INSERT INTO facades (id, project_id, name) VALUES ('fa', 'p1', 'A');
                     INSERT INTO floors (id, project_id, facade_id, floor_number, modules_plan, modules_fact)
                        VALUES ('f12', 'p1', 'fa', 12, 20, 5);",
                )
            })
            .await
            .unwrap();
        (db, dir)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 6, 12, 0, 0).unwrap()
    }

    fn foreman() -> Submitter {
        Submitter {
            user_id: "u-f2".into(),
            role: Role::Foreman2,
            chat_id: Some(555),
        }
    }

    fn photo_batch(floor_id: &str, files: &[&str]) -> PhotoSubmission {
        PhotoSubmission {
            project_id: "p1".into(),
            photo_type: PhotoType::Brackets,
            facade_id: "fa".into(),
            floor_id: floor_id.into(),
            file_references: files.iter().map(|f| f.to_string()).collect(),
            caption: Some("North side".into()),
            recipients: PHOTO_RECIPIENTS.to_vec(),
            submitter: foreman(),
        }
    }

    async fn photo_urls(db: &Database) -> Vec<String> {
        let raw: String = db
            .connection()
            .call(|conn| {
                conn.query_row("SELECT photo_urls FROM floors WHERE id = 'f12'", [], |row| {
                    row.get(0)
                })
            })
            .await
            .unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    async fn count(db: &Database, table: &'static str) -> i64 {
        db.connection()
            .call(move |conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            })
            .await
            .unwrap()
    }

    fn report_of(value: i64, floor_id: &str) -> ReportSubmission {
        ReportSubmission {
            project_id: "p1".into(),
            facade_id: "fa".into(),
            floor_id: floor_id.into(),
            value,
            report_date: NaiveDate::from_ymd_opt(2026, 3, 6).unwrap(),
            submitter: foreman(),
        }
    }

    #[tokio::test]
    async fn report_accumulates_fact_and_completes_floor() {
        let (db, _dir) = setup_db().await;
        let first = report(&db, &report_of(10, "f12"), now()).await.unwrap();
        assert_eq!(first.floor.modules_fact, 15);
        assert_eq!(first.floor.status, FloorStatus::InProgress);

        let second = report(&db, &report_of(5, "f12"), now()).await.unwrap();
        assert_eq!(second.floor.modules_fact, 20);
        assert_eq!(second.floor.status, FloorStatus::Done);
        assert_eq!(count(&db, "plan_fact").await, 2);

        let pm = inbox::list_for(&db, Some(&["p1".to_string()]), &[Role::Pm], 10).await.unwrap();
        assert_eq!(pm.len(), 2);
        assert_eq!(pm[0].kind, InboxKind::Report);

        let audited = entries(&db).await;
        assert_eq!(audited.len(), 2);
        assert!(audited.iter().all(|(user, action, _)| user == "u-f2" && action == "report:submit"));
        assert_eq!(audited[1].2["value"], 5);
        assert_eq!(audited[1].2["floor_id"], "f12");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn report_for_unknown_floor_writes_nothing() {
        let (db, _dir) = setup_db().await;
        let err = report(&db, &report_of(3, "f99"), now()).await.unwrap_err();
        assert!(matches!(err, SiteError::NotFound { entity: "floor", .. }));
        assert_eq!(count(&db, "plan_fact").await, 0);
        assert_eq!(count(&db, "bot_inbox").await, 0);
        assert_eq!(count(&db, "bot_audit_log").await, 0);
        assert!(report(&db, &report_of(0, "f12"), now()).await.is_err());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn document_fans_out_one_item_per_recipient() {
        let (db, _dir) = setup_db().await;
        let kind = document_kind("pm_permits").unwrap();
        let doc = DocumentSubmission {
            project_id: "p1".into(),
            doc_type: kind.key.into(),
            label: kind.label.into(),
            recipients: kind.recipients.to_vec(),
            file_reference: Some("file-7".into()),
            comment: None,
            submitter: Submitter {
                user_id: "u-pm".into(),
                role: Role::Pm,
                chat_id: Some(777),
            },
        };
        let id = document(&db, &doc, now()).await.unwrap();
        assert_eq!(count(&db, "documents").await, 1);
        assert_eq!(count(&db, "bot_inbox").await, 2);
        let pto = inbox::list_for(&db, None, &[Role::Pto], 10).await.unwrap();
        assert_eq!(pto[0].to_roles, vec![Role::Pto]);
        assert_eq!(pto[0].title, "Permit documentation");
        assert_eq!(pto[0].file_reference.as_deref(), Some("file-7"));

        let audited = entries(&db).await;
        assert_eq!(audited.len(), 1);
        assert_eq!(audited[0].1, "doc:sent");
        assert_eq!(audited[0].2["document_id"], id);
        assert_eq!(audited[0].2["doc_type"], "pm_permits");
        assert_eq!(audited[0].2["recipients"], serde_json::json!(["director", "pto"]));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn daily_log_creates_pending_approval() {
        let (db, _dir) = setup_db().await;
        let log = DailyLogSubmission {
            project_id: "p1".into(),
            log_date: NaiveDate::from_ymd_opt(2026, 3, 6).unwrap(),
            zone: "Axis 3-5".into(),
            works: "Bracket installation".into(),
            volume: "40 pcs".into(),
            workers: 6,
            issues: None,
            submitter: foreman(),
        };
        let id = daily_log(&db, &log, now()).await.unwrap();
        let pending = approvals::pending(&db, None, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, ApprovalKind::DailyLog);
        assert_eq!(pending[0].status, ApprovalStatus::Pending);
        assert_eq!(pending[0].level, 1);
        assert_eq!(pending[0].entity_id, Some(id.to_string()));
        assert_eq!(inbox::count_unread(&db, None, &[Role::Pm]).await.unwrap(), 1);
        assert_eq!(entries(&db).await[0].1, "daily_log:submit");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn alert_reaches_default_recipients() {
        let (db, _dir) = setup_db().await;
        alert(
            &db,
            &AlertSubmission {
                project_id: "p1".into(),
                priority: Priority::Critical,
                title: "Crane failure".into(),
                description: None,
                recipients: ALERT_RECIPIENTS.to_vec(),
                submitter: foreman(),
            },
            now(),
        )
        .await
        .unwrap();
        assert_eq!(inbox::count_unread(&db, None, &[Role::Director]).await.unwrap(), 1);
        assert_eq!(inbox::count_unread(&db, None, &[Role::Pm]).await.unwrap(), 1);
        assert_eq!(count(&db, "alerts").await, 1);
        let audited = entries(&db).await;
        assert_eq!(audited[0].1, "alert:create");
        assert_eq!(audited[0].2["priority"], "critical");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn photos_go_to_pm_and_pto_and_collect_on_the_floor() {
        let (db, _dir) = setup_db().await;
        photos(&db, &photo_batch("f12", &["ph-1", "ph-2"]), now()).await.unwrap();
        photos(&db, &photo_batch("f12", &["ph-3"]), now()).await.unwrap();

        assert_eq!(photo_urls(&db).await, vec!["ph-1", "ph-2", "ph-3"]);
        assert_eq!(inbox::count_unread(&db, None, &[Role::Pm]).await.unwrap(), 2);
        assert_eq!(inbox::count_unread(&db, None, &[Role::Pto]).await.unwrap(), 2);
        assert_eq!(inbox::count_unread(&db, None, &[Role::Director]).await.unwrap(), 0);

        let pto = inbox::list_for(&db, None, &[Role::Pto], 10).await.unwrap();
        assert!(pto.iter().any(|i| i.title == "📸 Brackets · A fl.12 (2)"));
        let stored: String = db
            .connection()
            .call(|conn| {
                conn.query_row(
                    "SELECT photo_type FROM photo_reports WHERE floor_id = 'f12' LIMIT 1",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(stored, "brackets");

        let audited = entries(&db).await;
        assert_eq!(audited.len(), 2);
        assert_eq!(audited[0].1, "photo:submit");
        assert_eq!(audited[0].2["photos"], 2);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn photos_for_a_foreign_floor_write_nothing() {
        let (db, _dir) = setup_db().await;
        let err = photos(&db, &photo_batch("f99", &["ph-1"]), now()).await.unwrap_err();
        assert!(matches!(err, SiteError::NotFound { entity: "floor", .. }));
        assert_eq!(count(&db, "photo_reports").await, 0);
        assert_eq!(count(&db, "bot_inbox").await, 0);
        assert!(photo_urls(&db).await.is_empty());

        let empty = photo_batch("f12", &[]);
        assert!(matches!(photos(&db, &empty, now()).await, Err(SiteError::Validation(_))));
        db.close().await.unwrap();
    }
}
