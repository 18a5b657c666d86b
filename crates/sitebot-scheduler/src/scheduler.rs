// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule evaluation for one tick.
//!
//! Every rule follows the same shape: check the scope's dedup key, skip
//! when an event already exists for the local day, otherwise aggregate the
//! payload and enqueue exactly one event. The queue's unique key makes a
//! racing second tick fall through as a duplicate instead of a second row.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc, Weekday};
use serde_json::{Value, json};
use sitebot_config::model::SchedulerConfig;
use sitebot_core::records::{AssignedTask, Project};
use sitebot_core::types::{EnqueueOutcome, EventType, InboxItem, NewEvent, Priority, dedup_key};
use sitebot_core::{Clock, Role, SiteError, StorageAdapter};
use strum::IntoEnumIterator;
use tracing::{debug, error, info, warn};

use crate::report::{RuleReport, TickReport};
use crate::rules::gate;

/// Items listed in a payload; the count carries the rest.
const LIST_LIMIT: usize = 5;

/// How long an expired session row is kept before the tick deletes it.
const SESSION_RETENTION_HOURS: i64 = 24;

const FOREMEN_AND_PM: [Role; 4] = [Role::Foreman1, Role::Foreman2, Role::Foreman3, Role::Pm];
const MANAGERS: [Role; 2] = [Role::Director, Role::Pm];

/// The instant a tick runs for, seen in the operating timezone.
struct Tick {
    /// Scheduled time of every event this tick enqueues.
    at: DateTime<Utc>,
    /// `at` in the operating timezone, checked by the rule gates.
    local: DateTime<FixedOffset>,
    /// Local calendar day, part of every dedup key.
    today: NaiveDate,
}

impl Tick {
    fn key(&self, rule: EventType, project_id: Option<&str>, subject: Option<&str>) -> String {
        dedup_key(rule, project_id, subject, self.today)
    }

    fn event(&self, rule: EventType, project_id: Option<&str>, subject: Option<&str>) -> NewEvent {
        NewEvent {
            event_type: rule,
            project_id: project_id.map(str::to_string),
            subject: subject.map(str::to_string),
            target_roles: Vec::new(),
            target_users: Vec::new(),
            target_chat_ids: Vec::new(),
            priority: Priority::Normal,
            payload: Value::Null,
            scheduled_at: self.at,
            local_date: self.today,
        }
    }

    fn hours_since(&self, then: DateTime<Utc>) -> i64 {
        (self.at - then).num_hours()
    }
}

fn project_label(project: &Project) -> &str {
    project.code.as_deref().unwrap_or(&project.name)
}

/// Evaluates the notification rules against storage.
pub struct Scheduler {
    store: Arc<dyn StorageAdapter>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    offset: FixedOffset,
    weekly_day: Weekday,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn StorageAdapter>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Result<Self, SiteError> {
        let offset = config.offset().ok_or_else(|| {
            SiteError::Config(format!(
                "scheduler.utc_offset_hours {} is not a valid offset",
                config.utc_offset_hours
            ))
        })?;
        let weekly_day = config.weekly_weekday().ok_or_else(|| {
            SiteError::Config(format!(
                "scheduler.weekly_summary_day `{}` is not a weekday",
                config.weekly_summary_day
            ))
        })?;
        Ok(Self {
            store,
            clock,
            config,
            offset,
            weekly_day,
        })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run every rule due at the current time.
    pub async fn tick(&self) -> TickReport {
        self.run_tick(self.clock.now(), None).await
    }

    /// Run the rules due at `at`, or only `only` regardless of its gate.
    ///
    /// A failing rule is logged and reported; the remaining rules still run.
    pub async fn run_tick(&self, at: DateTime<Utc>, only: Option<EventType>) -> TickReport {
        let local = at.with_timezone(&self.offset);
        let tick = Tick {
            at,
            local,
            today: local.date_naive(),
        };
        let due: Vec<EventType> = match only {
            Some(rule) => vec![rule],
            None => EventType::iter()
                .filter(|rule| gate(*rule, &self.config, self.weekly_day).is_open(&tick.local))
                .collect(),
        };

        let mut rules = Vec::with_capacity(due.len());
        for rule in due {
            let mut report = RuleReport::new(rule);
            if let Err(e) = self.run_rule(&tick, &mut report).await {
                error!(rule = %rule, error = %e, "scheduler rule failed");
                report.error = Some(e.to_string());
            }
            debug!(
                rule = %rule,
                enqueued = report.enqueued,
                skipped_duplicate = report.skipped_duplicate,
                skipped_preference = report.skipped_preference,
                "rule evaluated"
            );
            rules.push(report);
        }

        let sessions_purged = if only.is_none() {
            self.purge_sessions(&tick).await
        } else {
            0
        };

        let report = TickReport {
            at,
            local_time: tick.local.format("%Y-%m-%d %H:%M").to_string(),
            rules,
            sessions_purged,
        };
        info!(
            local_time = %report.local_time,
            rules = report.rules.len(),
            enqueued = report.total_enqueued(),
            sessions_purged,
            "scheduler tick finished"
        );
        report
    }

    async fn purge_sessions(&self, tick: &Tick) -> usize {
        let cutoff = tick.at - Duration::hours(SESSION_RETENTION_HOURS);
        match self.store.purge_expired_sessions(cutoff).await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "expired session purge failed");
                0
            }
        }
    }

    async fn run_rule(&self, tick: &Tick, report: &mut RuleReport) -> Result<(), SiteError> {
        match report.rule {
            EventType::PlanMorning => self.morning_plan(tick, report).await,
            EventType::DirectorDigest => self.director_digest(tick, report).await,
            EventType::BriefingSupply => self.supply_briefing(tick, report).await,
            EventType::BriefingProduction => self.production_briefing(tick, report).await,
            EventType::BriefingPto => self.pto_briefing(tick, report).await,
            EventType::BriefingInspector => self.inspector_briefing(tick, report).await,
            EventType::AlertOverdue => self.alert_escalation(tick, report).await,
            EventType::DocumentOverdue => self.overdue_documents(tick, report).await,
            EventType::TaskDeadline => self.task_deadlines(tick, report).await,
            EventType::TaskOverdue => self.overdue_tasks(tick, report).await,
            EventType::ReportMissing => self.missing_reports(tick, report).await,
            EventType::WeeklySummary => self.weekly_summary(tick, report).await,
            EventType::EveningFact => self.evening_fact(tick, report).await,
        }
    }

    // --- shared steps ---

    /// Whether the scope already has today's event. Counts the skip.
    async fn seen(
        &self,
        tick: &Tick,
        report: &mut RuleReport,
        project_id: Option<&str>,
        subject: Option<&str>,
    ) -> Result<bool, SiteError> {
        let key = tick.key(report.rule, project_id, subject);
        let seen = self.store.event_exists(&key).await?;
        if seen {
            report.skipped_duplicate += 1;
        }
        Ok(seen)
    }

    async fn push(
        &self,
        tick: &Tick,
        report: &mut RuleReport,
        event: NewEvent,
    ) -> Result<(), SiteError> {
        match self.store.enqueue_event(&event, tick.at).await? {
            EnqueueOutcome::Inserted(id) => {
                report.enqueued += 1;
                debug!(event_id = id, key = %event.dedup_key(), "event enqueued");
            }
            EnqueueOutcome::Duplicate => {
                report.skipped_duplicate += 1;
                debug!(key = %event.dedup_key(), "event enqueued concurrently");
            }
        }
        Ok(())
    }

    async fn projects(&self) -> Result<Vec<Project>, SiteError> {
        self.store.active_projects(None).await
    }

    // --- daily rules ---

    async fn morning_plan(&self, tick: &Tick, report: &mut RuleReport) -> Result<(), SiteError> {
        let yesterday = tick.today.pred_opt().unwrap_or(tick.today);
        for project in self.projects().await? {
            if self.seen(tick, report, Some(&project.id), None).await? {
                continue;
            }
            let Some(progress) = self.store.project_progress(&project.id).await? else {
                continue;
            };
            let fact = self
                .store
                .fact_summary(&project.id, yesterday, yesterday)
                .await?;
            let mut event = tick.event(report.rule, Some(&project.id), None);
            event.target_roles = FOREMEN_AND_PM.to_vec();
            event.payload = json!({
                "project_name": project_label(&project),
                "date": tick.today.to_string(),
                "modules_plan": progress.modules_plan,
                "modules_fact": progress.modules_fact,
                "percent": progress.percent(),
                "yesterday_fact": fact.fact_total,
                "open_alerts": progress.open_alerts,
                "open_tasks": progress.open_tasks,
            });
            self.push(tick, report, event).await?;
        }
        Ok(())
    }

    async fn director_digest(&self, tick: &Tick, report: &mut RuleReport) -> Result<(), SiteError> {
        if self.seen(tick, report, None, None).await? {
            return Ok(());
        }
        let mut rows = Vec::new();
        let mut total_alerts = 0;
        for project in self.projects().await? {
            if let Some(progress) = self.store.project_progress(&project.id).await? {
                total_alerts += progress.open_alerts;
                rows.push(json!({
                    "id": project.id,
                    "name": project_label(&project),
                    "percent": progress.percent(),
                    "open_alerts": progress.open_alerts,
                }));
            }
        }
        if rows.is_empty() {
            return Ok(());
        }
        let mut event = tick.event(report.rule, None, None);
        event.target_roles = MANAGERS.to_vec();
        event.payload = json!({
            "date": tick.today.to_string(),
            "projects": rows,
            "total_alerts": total_alerts,
        });
        self.push(tick, report, event).await
    }

    async fn supply_briefing(&self, tick: &Tick, report: &mut RuleReport) -> Result<(), SiteError> {
        for project in self.projects().await? {
            if self.seen(tick, report, Some(&project.id), None).await? {
                continue;
            }
            let deficits = self.store.material_deficits(&project.id).await?;
            if deficits.is_empty() {
                continue;
            }
            let mut event = tick.event(report.rule, Some(&project.id), None);
            event.target_roles = vec![Role::Supply];
            // A material with nothing on hand stops work.
            if deficits.iter().any(|d| d.available <= 0.0) {
                event.priority = Priority::High;
            }
            let items: Vec<Value> = deficits
                .iter()
                .take(LIST_LIMIT)
                .map(|d| json!({"name": d.name, "unit": d.unit, "shortfall": d.shortfall()}))
                .collect();
            event.payload = json!({
                "project_name": project_label(&project),
                "count": deficits.len(),
                "items": items,
            });
            self.push(tick, report, event).await?;
        }
        Ok(())
    }

    async fn production_briefing(
        &self,
        tick: &Tick,
        report: &mut RuleReport,
    ) -> Result<(), SiteError> {
        for project in self.projects().await? {
            if self.seen(tick, report, Some(&project.id), None).await? {
                continue;
            }
            let orders = self.store.open_orders(&project.id).await?;
            if orders.is_empty() {
                continue;
            }
            let list: Vec<Value> = orders
                .iter()
                .take(LIST_LIMIT)
                .map(|o| {
                    json!({
                        "title": o.title,
                        "status": o.status,
                        "due_date": o.due_date.map(|d| d.to_string()),
                    })
                })
                .collect();
            let mut event = tick.event(report.rule, Some(&project.id), None);
            event.target_roles = vec![Role::Production];
            event.payload = json!({
                "project_name": project_label(&project),
                "count": orders.len(),
                "orders": list,
            });
            self.push(tick, report, event).await?;
        }
        Ok(())
    }

    async fn pto_briefing(&self, tick: &Tick, report: &mut RuleReport) -> Result<(), SiteError> {
        if self.seen(tick, report, None, None).await? {
            return Ok(());
        }
        let unread = self.store.count_unread(None, &[Role::Pto]).await?;
        if unread == 0 {
            return Ok(());
        }
        let mut event = tick.event(report.rule, None, None);
        event.target_roles = vec![Role::Pto];
        event.payload = json!({
            "date": tick.today.to_string(),
            "unread": unread,
        });
        self.push(tick, report, event).await
    }

    async fn inspector_briefing(
        &self,
        tick: &Tick,
        report: &mut RuleReport,
    ) -> Result<(), SiteError> {
        for project in self.projects().await? {
            if self.seen(tick, report, Some(&project.id), None).await? {
                continue;
            }
            let alerts = self.store.alerts_open_since(&project.id, tick.at).await?;
            if alerts.is_empty() {
                continue;
            }
            let critical = alerts
                .iter()
                .filter(|a| a.priority == Priority::Critical)
                .count();
            let list: Vec<Value> = alerts
                .iter()
                .take(LIST_LIMIT)
                .map(|a| json!({"title": a.title, "priority": a.priority}))
                .collect();
            let mut event = tick.event(report.rule, Some(&project.id), None);
            event.target_roles = vec![Role::Inspector];
            event.payload = json!({
                "project_name": project_label(&project),
                "count": alerts.len(),
                "critical": critical,
                "alerts": list,
            });
            self.push(tick, report, event).await?;
        }
        Ok(())
    }

    async fn alert_escalation(&self, tick: &Tick, report: &mut RuleReport) -> Result<(), SiteError> {
        let cutoff = tick.at - Duration::hours(i64::from(self.config.escalation_after_hours));
        for project in self.projects().await? {
            if self.seen(tick, report, Some(&project.id), None).await? {
                continue;
            }
            let alerts = self.store.alerts_open_since(&project.id, cutoff).await?;
            if alerts.is_empty() {
                continue;
            }
            let list: Vec<Value> = alerts
                .iter()
                .take(LIST_LIMIT)
                .map(|a| {
                    json!({
                        "title": a.title,
                        "priority": a.priority,
                        "age_hours": tick.hours_since(a.created_at),
                    })
                })
                .collect();
            let mut event = tick.event(report.rule, Some(&project.id), None);
            event.target_roles = MANAGERS.to_vec();
            event.priority = if alerts.iter().any(|a| a.priority == Priority::Critical) {
                Priority::Critical
            } else {
                Priority::High
            };
            event.payload = json!({
                "project_name": project_label(&project),
                "count": alerts.len(),
                "list": list,
            });
            self.push(tick, report, event).await?;
        }
        Ok(())
    }

    async fn overdue_documents(
        &self,
        tick: &Tick,
        report: &mut RuleReport,
    ) -> Result<(), SiteError> {
        let cutoff = tick.at - Duration::hours(i64::from(self.config.escalation_after_hours));
        let stale = self.store.stale_documents(cutoff).await?;
        let mut by_project: BTreeMap<Option<String>, Vec<InboxItem>> = BTreeMap::new();
        for item in stale {
            by_project.entry(item.project_id.clone()).or_default().push(item);
        }

        for (project_id, items) in by_project {
            if self.seen(tick, report, project_id.as_deref(), None).await? {
                continue;
            }
            let project_name = match project_id.as_deref() {
                Some(id) => self
                    .store
                    .get_project(id)
                    .await?
                    .map(|p| project_label(&p).to_string()),
                None => None,
            };
            let mut roles: Vec<Role> = items
                .iter()
                .flat_map(|i| i.to_roles.iter().copied())
                .chain([Role::Pm])
                .collect();
            roles.sort();
            roles.dedup();
            let list: Vec<Value> = items
                .iter()
                .take(LIST_LIMIT)
                .map(|i| json!({"title": i.title, "age_hours": tick.hours_since(i.created_at)}))
                .collect();
            let mut event = tick.event(report.rule, project_id.as_deref(), None);
            event.target_roles = roles;
            event.priority = Priority::High;
            event.payload = json!({
                "project_name": project_name,
                "count": items.len(),
                "documents": list,
            });
            self.push(tick, report, event).await?;
        }
        Ok(())
    }

    // --- hourly task sweeps ---

    async fn task_deadlines(&self, tick: &Tick, report: &mut RuleReport) -> Result<(), SiteError> {
        let until = tick.at + Duration::hours(i64::from(self.config.deadline_window_hours));
        for assigned in self.store.tasks_due_between(tick.at, until).await? {
            if !assigned.deadline_warnings {
                report.skipped_preference += 1;
                continue;
            }
            let task_id = assigned.task.id;
            let subject = task_id.to_string();
            if self
                .seen(tick, report, Some(&assigned.task.project_id), Some(&subject))
                .await?
            {
                self.store.mark_reminder_sent(task_id).await?;
                continue;
            }
            let Some(mut event) = task_event(tick, report.rule, &assigned, &subject) else {
                debug!(task_id, "task has nobody to remind");
                continue;
            };
            event.payload["hours_left"] = json!(
                assigned
                    .task
                    .deadline
                    .map(|d| (d - tick.at).num_hours())
                    .unwrap_or_default()
            );
            self.push(tick, report, event).await?;
            self.store.mark_reminder_sent(task_id).await?;
        }
        Ok(())
    }

    async fn overdue_tasks(&self, tick: &Tick, report: &mut RuleReport) -> Result<(), SiteError> {
        for assigned in self.store.overdue_tasks(tick.at).await? {
            let subject = assigned.task.id.to_string();
            if self
                .seen(tick, report, Some(&assigned.task.project_id), Some(&subject))
                .await?
            {
                continue;
            }
            let Some(mut event) = task_event(tick, report.rule, &assigned, &subject) else {
                continue;
            };
            if !event.target_roles.contains(&Role::Pm) {
                event.target_roles.push(Role::Pm);
            }
            event.payload["overdue_hours"] = json!(
                assigned
                    .task
                    .deadline
                    .map(|d| tick.hours_since(d))
                    .unwrap_or_default()
            );
            self.push(tick, report, event).await?;
        }
        Ok(())
    }

    async fn missing_reports(&self, tick: &Tick, report: &mut RuleReport) -> Result<(), SiteError> {
        for project in self.projects().await? {
            for foreman in self.store.foremen_for_project(&project.id).await? {
                if !foreman.report_reminders {
                    report.skipped_preference += 1;
                    continue;
                }
                let Some(chat_id) = foreman.chat_id else {
                    debug!(user_id = %foreman.user_id, "foreman has no linked chat");
                    continue;
                };
                if self
                    .seen(tick, report, Some(&project.id), Some(&foreman.user_id))
                    .await?
                {
                    continue;
                }
                if self
                    .store
                    .has_report(&project.id, &foreman.user_id, tick.today)
                    .await?
                {
                    continue;
                }
                let mut event =
                    tick.event(report.rule, Some(&project.id), Some(&foreman.user_id));
                event.target_users = vec![foreman.user_id.clone()];
                event.target_chat_ids = vec![chat_id];
                event.payload = json!({
                    "project_name": project_label(&project),
                    "date": tick.today.to_string(),
                    "display_name": foreman.display_name,
                });
                self.push(tick, report, event).await?;
            }
        }
        Ok(())
    }

    // --- progress rollups ---

    async fn weekly_summary(&self, tick: &Tick, report: &mut RuleReport) -> Result<(), SiteError> {
        let from = tick.today - Duration::days(6);
        for project in self.projects().await? {
            if self.seen(tick, report, Some(&project.id), None).await? {
                continue;
            }
            let fact = self.store.fact_summary(&project.id, from, tick.today).await?;
            let mut event = tick.event(report.rule, Some(&project.id), None);
            event.target_roles = MANAGERS.to_vec();
            event.priority = Priority::Low;
            event.payload = json!({
                "project_name": project_label(&project),
                "from": from.to_string(),
                "to": tick.today.to_string(),
                "fact_total": fact.fact_total,
                "reports": fact.reports,
                "floors_done": fact.floors_done,
                "ai_summary_requested": true,
            });
            self.push(tick, report, event).await?;
        }
        Ok(())
    }

    async fn evening_fact(&self, tick: &Tick, report: &mut RuleReport) -> Result<(), SiteError> {
        for project in self.projects().await? {
            if self.seen(tick, report, Some(&project.id), None).await? {
                continue;
            }
            let fact = self
                .store
                .fact_summary(&project.id, tick.today, tick.today)
                .await?;
            let mut event = tick.event(report.rule, Some(&project.id), None);
            event.target_roles = MANAGERS.to_vec();
            event.payload = json!({
                "project_name": project_label(&project),
                "date": tick.today.to_string(),
                "fact_total": fact.fact_total,
                "reports": fact.reports,
                "floors_done": fact.floors_done,
            });
            self.push(tick, report, event).await?;
        }
        Ok(())
    }
}

/// An event addressed to a task's assignee, or `None` when nobody is reachable.
fn task_event(
    tick: &Tick,
    rule: EventType,
    assigned: &AssignedTask,
    subject: &str,
) -> Option<NewEvent> {
    let task = &assigned.task;
    let mut event = tick.event(rule, Some(&task.project_id), Some(subject));
    event.priority = Priority::High;
    event.target_users = task.assigned_to.iter().cloned().collect();
    event.target_chat_ids = assigned.assignee_chat_id.into_iter().collect();
    event.target_roles = task.assigned_role.into_iter().collect();
    if !event.has_targets() {
        return None;
    }
    event.payload = json!({
        "task_id": task.id,
        "title": task.title,
        "deadline": task.deadline.map(|d| d.to_rfc3339()),
    });
    Some(event)
}
