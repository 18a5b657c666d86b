// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Construction-site business records and flow submissions.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::types::{Priority, Role};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Short internal code, e.g. "TWR-01".
    pub code: Option<String>,
    /// Free-form lifecycle status; `active` projects feed the scheduler.
    pub status: String,
    pub end_date: Option<NaiveDate>,
}

/// Project with its rolled-up module counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectProgress {
    pub project: Project,
    /// Sum of `floors.modules_plan` across the project.
    pub modules_plan: i64,
    /// Sum of `floors.modules_fact` across the project.
    pub modules_fact: i64,
    /// Alerts not yet resolved.
    pub open_alerts: i64,
    /// Tasks not in `done`.
    pub open_tasks: i64,
}

impl ProjectProgress {
    /// Completion percentage, clamped to 0..=100.
    pub fn percent(&self) -> u8 {
        if self.modules_plan <= 0 {
            return 0;
        }
        let pct = self.modules_fact.saturating_mul(100) / self.modules_plan;
        pct.clamp(0, 100) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facade {
    pub id: String,
    pub project_id: String,
    pub name: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FloorStatus {
    Pending,
    InProgress,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Floor {
    pub id: String,
    pub project_id: String,
    pub facade_id: String,
    pub floor_number: i32,
    /// Modules planned for the floor.
    pub modules_plan: i64,
    /// Modules mounted so far, the running sum of reports.
    pub modules_fact: i64,
    pub status: FloorStatus,
}

impl Floor {
    /// Status implied by the cumulative fact against plan.
    pub fn status_for(modules_fact: i64, modules_plan: i64) -> FloorStatus {
        if modules_fact <= 0 {
            FloorStatus::Pending
        } else if modules_fact >= modules_plan {
            FloorStatus::Done
        } else {
            FloorStatus::InProgress
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: i64,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    /// Assigned user id, if the task targets one person.
    pub assigned_to: Option<String>,
    /// Assigned role, if the task targets a department.
    pub assigned_role: Option<Role>,
    pub deadline: Option<DateTime<Utc>>,
    /// Set once the deadline reminder has been enqueued.
    pub reminder_sent: bool,
}

/// A task joined with its assignee's delivery details.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignedTask {
    pub task: Task,
    pub assignee_chat_id: Option<i64>,
    /// Assignee's `deadline_warnings` notification preference.
    pub deadline_warnings: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub id: i64,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub is_resolved: bool,
    /// User id of the reporter.
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// A foreman expected to report on a project, with delivery details.
#[derive(Debug, Clone, PartialEq)]
pub struct ForemanOnDuty {
    pub user_id: String,
    pub display_name: String,
    pub chat_id: Option<i64>,
    /// Foreman's `report_reminders` notification preference.
    pub report_reminders: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDeficit {
    pub project_id: String,
    pub name: String,
    pub unit: String,
    pub required: f64,
    pub available: f64,
}

impl MaterialDeficit {
    pub fn shortfall(&self) -> f64 {
        (self.required - self.available).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOrder {
    pub id: i64,
    pub project_id: String,
    pub title: String,
    pub status: String,
    pub due_date: Option<NaiveDate>,
}

/// Reported fact for one project over a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FactSummary {
    /// Modules reported in the range.
    pub fact_total: i64,
    /// Number of `plan_fact` rows in the range.
    pub reports: i64,
    /// Floors that reached `done` in the range.
    pub floors_done: i64,
}

// --- Flow submissions ---

/// Recipients of a photo batch.
pub const PHOTO_RECIPIENTS: [Role; 2] = [Role::Pm, Role::Pto];

/// Recipients of a site alert.
pub const ALERT_RECIPIENTS: [Role; 2] = [Role::Director, Role::Pm];

/// What a photo batch documents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PhotoType {
    Daily,
    Brackets,
    Frame,
    Glass,
}

impl PhotoType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Daily => "Daily progress",
            Self::Brackets => "Brackets",
            Self::Frame => "Frame",
            Self::Glass => "Glazing",
        }
    }
}

/// One entry of a role's document catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentKind {
    /// Stable key stored in `documents.doc_type`, unique across all roles.
    pub key: &'static str,
    pub label: &'static str,
    /// Preselected recipients; the sender may edit them before sending.
    pub recipients: &'static [Role],
}

const fn kind(
    key: &'static str,
    label: &'static str,
    recipients: &'static [Role],
) -> DocumentKind {
    DocumentKind {
        key,
        label,
        recipients,
    }
}

const FOREMEN: [Role; 3] = [Role::Foreman1, Role::Foreman2, Role::Foreman3];

const PM_DOCUMENTS: &[DocumentKind] = &[
    kind(
        "pm_schedule",
        "Work schedule",
        &[
            Role::ProjectOpr,
            Role::ProjectKm,
            Role::ProjectKmd,
            Role::Supply,
            Role::Production,
            Role::Foreman1,
            Role::Pto,
        ],
    ),
    kind("pm_assign", "Responsibility assignment", &[Role::Director]),
    kind("pm_permits", "Permit documentation", &[Role::Director, Role::Pto]),
    kind(
        "pm_docreq",
        "Design documentation request",
        &[Role::ProjectOpr, Role::ProjectKm, Role::ProjectKmd],
    ),
    kind("pm_samples", "Sample approval", &[Role::Supply, Role::Production]),
    kind("pm_geodesy", "Geodetic survey", &[Role::ProjectKmd]),
    kind("pm_escalate", "Escalation", &[Role::Director]),
    kind("pm_photoreq", "Photo report request", &FOREMEN),
    kind("pm_summary", "Director summary", &[Role::Director]),
    kind("pm_supply_request", "Material request", &[Role::Supply]),
    kind("pm_prod_quote", "Quotation request", &[Role::Production]),
    kind(
        "pm_prod_shipment",
        "Shipment approval",
        &[Role::Production, Role::Supply],
    ),
];

const OPR_DOCUMENTS: &[DocumentKind] = &[
    kind("opr_system", "Facade system choice", &[Role::Pm]),
    kind("opr_calc", "Structural calculations", &[Role::Pm]),
    kind("opr_nodes", "Node details", &[Role::Pm, Role::Production]),
    kind("opr_facades", "Facades and plans", &[Role::Pm, Role::ProjectKm]),
];

const KM_DOCUMENTS: &[DocumentKind] = &[
    kind("km_detail", "Facade detailing", &[Role::Pm, Role::ProjectKmd]),
    kind("km_spec", "Specifications", &[Role::Supply, Role::Pm]),
    kind("km_quantities", "Bill of quantities", &[Role::Pm]),
    kind("km_brief", "Brief for related works", &[Role::Supply, Role::Pm]),
];

const KMD_DOCUMENTS: &[DocumentKind] = &[
    kind("kmd_geo", "Geodesy overlay", &[Role::Pm]),
    kind("kmd_brackets", "Bracket drawings", &[Role::Production, Role::Pm]),
    kind("kmd_shop", "Shop drawings", &[Role::Production, Role::Pm]),
    kind("kmd_glass", "Infill order", &[Role::Supply, Role::Pm]),
];

const SUPPLY_DOCUMENTS: &[DocumentKind] = &[
    kind("sup_status", "Procurement status", &[Role::Pm]),
    kind("sup_shipment", "Shipment notice", &[Role::Production, Role::Pm]),
    kind("sup_mismatch", "Delivery mismatch report", &[Role::Pm]),
    kind("sup_transport", "Transport request", &[Role::Pm, Role::Production]),
];

const PRODUCTION_DOCUMENTS: &[DocumentKind] = &[
    kind("prod_quote", "Quotation and schedule", &[Role::Pm, Role::Supply]),
    kind("prod_accept", "Receipt confirmation", &[Role::Supply, Role::Pm]),
    kind("prod_waybill", "Waybill", &[Role::Pm]),
    kind("prod_stock", "Stock report", &[Role::Pm, Role::Supply]),
];

const FOREMAN_DOCUMENTS: &[DocumentKind] = &[
    kind("f_tool", "Tool request", &[Role::Pm, Role::Supply]),
    kind("f_daily", "Daily photo report", &[Role::Pm]),
    kind("f_hidden", "Hidden works act", &[Role::Pto, Role::Pm]),
    kind("f_issue", "Site issue", &[Role::Pm]),
    kind("f_stage_brackets", "Stage: brackets", &[Role::Pm, Role::Pto]),
    kind("f_stage_frame", "Stage: frame", &[Role::Pm, Role::Pto]),
    kind("f_stage_glass", "Stage: glazing", &[Role::Pm, Role::Pto]),
];

const PTO_DOCUMENTS: &[DocumentKind] = &[
    kind(
        "pto_brackets",
        "Inspection certificate: brackets",
        &[Role::Pm, Role::Foreman1, Role::Foreman2, Role::Foreman3],
    ),
    kind(
        "pto_frame",
        "Inspection certificate: frame",
        &[Role::Pm, Role::Foreman1, Role::Foreman2, Role::Foreman3],
    ),
    kind(
        "pto_glass",
        "Inspection certificate: glazing",
        &[Role::Pm, Role::Foreman1, Role::Foreman2, Role::Foreman3],
    ),
    kind("pto_schemes", "As-built schemes", &[Role::Pm]),
];

const INSPECTOR_DOCUMENTS: &[DocumentKind] = &[
    kind(
        "insp_quality",
        "Quality remark",
        &[Role::Pm, Role::Foreman1, Role::Foreman2, Role::Foreman3],
    ),
    kind(
        "insp_stop",
        "Work stoppage",
        &[
            Role::Pm,
            Role::Director,
            Role::Foreman1,
            Role::Foreman2,
            Role::Foreman3,
        ],
    ),
    kind("insp_photo", "Violation photo record", &[Role::Pm]),
];

/// Document types a role may send. Empty for roles without a send screen.
pub fn document_catalogue(role: Role) -> &'static [DocumentKind] {
    match role {
        Role::Pm => PM_DOCUMENTS,
        Role::Project | Role::ProjectOpr => OPR_DOCUMENTS,
        Role::ProjectKm => KM_DOCUMENTS,
        Role::ProjectKmd => KMD_DOCUMENTS,
        Role::Supply => SUPPLY_DOCUMENTS,
        Role::Production => PRODUCTION_DOCUMENTS,
        Role::Foreman1 | Role::Foreman2 | Role::Foreman3 => FOREMAN_DOCUMENTS,
        Role::Pto => PTO_DOCUMENTS,
        Role::Inspector => INSPECTOR_DOCUMENTS,
        Role::Director | Role::Generic => &[],
    }
}

/// Looks a document kind up by key across every catalogue.
pub fn document_kind(key: &str) -> Option<&'static DocumentKind> {
    [
        PM_DOCUMENTS,
        OPR_DOCUMENTS,
        KM_DOCUMENTS,
        KMD_DOCUMENTS,
        SUPPLY_DOCUMENTS,
        PRODUCTION_DOCUMENTS,
        FOREMAN_DOCUMENTS,
        PTO_DOCUMENTS,
        INSPECTOR_DOCUMENTS,
    ]
    .into_iter()
    .flatten()
    .find(|k| k.key == key)
}

/// Who submitted a flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitter {
    pub user_id: String,
    pub role: Role,
    /// Chat the flow ran in, recorded in the audit log.
    pub chat_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSubmission {
    pub project_id: String,
    /// Catalogue key, see [`document_catalogue`].
    pub doc_type: String,
    /// Human label shown as the inbox title.
    pub label: String,
    pub recipients: Vec<Role>,
    pub file_reference: Option<String>,
    pub comment: Option<String>,
    pub submitter: Submitter,
}

/// A batch of site photos tied to one floor.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoSubmission {
    pub project_id: String,
    pub photo_type: PhotoType,
    pub facade_id: String,
    /// Receives the file references in its `photo_urls` list.
    pub floor_id: String,
    pub file_references: Vec<String>,
    pub caption: Option<String>,
    pub recipients: Vec<Role>,
    pub submitter: Submitter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyLogSubmission {
    pub project_id: String,
    pub log_date: NaiveDate,
    /// Free-text work zone, e.g. "facade A, floors 10-12".
    pub zone: String,
    pub works: String,
    pub volume: String,
    /// Headcount on site that day.
    pub workers: u32,
    pub issues: Option<String>,
    pub submitter: Submitter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertSubmission {
    pub project_id: String,
    pub priority: Priority,
    pub title: String,
    pub description: Option<String>,
    pub recipients: Vec<Role>,
    pub submitter: Submitter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSubmission {
    pub project_id: String,
    pub facade_id: String,
    pub floor_id: String,
    /// Modules mounted since the previous report.
    pub value: i64,
    pub report_date: NaiveDate,
    pub submitter: Submitter,
}

/// Floor state after a foreman report was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloorProgress {
    /// Row id of the `plan_fact` entry just written.
    pub plan_fact_id: i64,
    /// The floor with its updated totals and status.
    pub floor: Floor,
}

// --- Stage acceptance ---

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    PendingInspector,
    Accepted,
    Rejected,
}

/// An inspector's verdict on a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject,
}

impl Verdict {
    pub fn status(self) -> StageStatus {
        match self {
            Self::Accept => StageStatus::Accepted,
            Self::Reject => StageStatus::Rejected,
        }
    }
}

/// A finished construction stage on one floor awaiting the technical inspector.
#[derive(Debug, Clone, PartialEq)]
pub struct StageAcceptance {
    pub id: i64,
    pub project_id: String,
    pub facade_id: Option<String>,
    pub floor_id: Option<String>,
    /// Stage name as entered by the site, e.g. "Brackets".
    pub stage: String,
    pub notes: Option<String>,
    pub status: StageStatus,
    /// Joined from `facades.name` for display.
    pub facade_name: Option<String>,
    /// Joined from `floors.floor_number` for display.
    pub floor_number: Option<i32>,
    pub inspector_id: Option<String>,
    pub inspected_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Result of deciding a stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// The stage left `pending_inspector` with this call.
    Applied(StageAcceptance),
    /// Someone already decided the stage; nothing changed.
    AlreadyDecided(StageAcceptance),
}
