// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Menu and business actions reached from callbacks and commands.
//!
//! Each action loads what it needs, checks the caller may see it and renders
//! a screen onto the pinned message. Authorization failures surface as
//! [`SiteError::Forbidden`], missing records as [`SiteError::NotFound`]; the
//! dispatcher turns both into screens.

use std::sync::Arc;

use sitebot_core::records::{StageAcceptance, StageOutcome, TaskStatus, Verdict};
use sitebot_core::types::{Decision, DecisionOutcome, Identity, InboxItem, InboxStatus, PreferenceKey};
use sitebot_core::{Clock, Role, SiteError, StorageAdapter};
use tracing::info;

use crate::render::{Renderer, Screen};
use crate::roles::{Surface, primary_role};
use crate::screens;
use crate::session::{Conversation, SessionManager};
use crate::settings::WorkflowSettings;

const LIST_LIMIT: usize = 10;

/// Everything an action needs, shared by all turns.
#[derive(Clone)]
pub(crate) struct Services {
    pub store: Arc<dyn StorageAdapter>,
    pub renderer: Renderer,
    pub sessions: SessionManager,
    pub clock: Arc<dyn Clock>,
    pub settings: WorkflowSettings,
}

/// The caller of one update, with their resolved role.
#[derive(Debug, Clone)]
pub(crate) struct Turn {
    pub identity: Identity,
    pub role: Role,
    pub surface: Surface,
}

impl Turn {
    pub fn new(identity: Identity) -> Self {
        let role = primary_role(&identity.roles());
        Self {
            identity,
            role,
            surface: Surface::of(role),
        }
    }

    fn is_manager(&self) -> bool {
        self.identity.has_role(Role::Director) || self.identity.has_role(Role::Pm)
    }

    fn scope(&self) -> Option<Vec<String>> {
        self.identity.project_scope()
    }

    fn in_scope(&self, project_id: &str) -> bool {
        self.scope()
            .is_none_or(|ids| ids.iter().any(|id| id == project_id))
    }

    fn inbox_roles(&self) -> Vec<Role> {
        self.surface.inbox_roles(self.role)
    }
}

/// Render `screen` on the pinned message, persisting the pin if it moved.
pub(crate) async fn show(
    svc: &Services,
    conv: &mut Conversation,
    screen: &Screen,
) -> Result<(), SiteError> {
    let before = conv.pinned;
    svc.renderer.show(conv.chat_id, &mut conv.pinned, screen).await?;
    if conv.pinned != before {
        svc.sessions.save(conv).await?;
    }
    Ok(())
}

async fn menu_screen(svc: &Services, turn: &Turn, hint: Option<&str>) -> Result<Screen, SiteError> {
    let scope = turn.scope();
    let unread = svc
        .store
        .count_unread(scope.as_deref(), &turn.inbox_roles())
        .await?;
    Ok(screens::menu::menu(
        turn.surface,
        &turn.identity.display_name,
        unread,
        hint,
    ))
}

pub(crate) async fn show_menu(
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
    hint: Option<&str>,
) -> Result<(), SiteError> {
    let screen = menu_screen(svc, turn, hint).await?;
    show(svc, conv, &screen).await
}

/// Send a fresh menu at the bottom of the chat, dropping the old pinned screen.
pub(crate) async fn replace_with_menu(
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
) -> Result<(), SiteError> {
    let screen = menu_screen(svc, turn, None).await?;
    svc.renderer
        .replace(conv.chat_id, &mut conv.pinned, &screen)
        .await?;
    svc.sessions.save(conv).await
}

// --- menu lists ---

pub(crate) async fn inbox(svc: &Services, turn: &Turn, conv: &mut Conversation) -> Result<(), SiteError> {
    let scope = turn.scope();
    let items = svc
        .store
        .list_inbox(scope.as_deref(), &turn.inbox_roles(), LIST_LIMIT)
        .await?;
    show(svc, conv, &screens::inbox::list(&items, &svc.settings)).await
}

pub(crate) async fn approvals(
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
) -> Result<(), SiteError> {
    let scope = turn.scope();
    let pending = svc
        .store
        .pending_approvals(scope.as_deref(), LIST_LIMIT)
        .await?;
    show(svc, conv, &screens::approvals::list(&pending, &svc.settings)).await
}

pub(crate) async fn alerts(svc: &Services, turn: &Turn, conv: &mut Conversation) -> Result<(), SiteError> {
    let scope = turn.scope();
    let open = svc.store.open_alerts(scope.as_deref(), LIST_LIMIT).await?;
    show(svc, conv, &screens::alerts::list(&open, &svc.settings)).await
}

pub(crate) async fn tasks(
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
    hint: Option<&str>,
) -> Result<(), SiteError> {
    let tasks = svc.store.tasks_for_user(&turn.identity.user_id).await?;
    show(svc, conv, &screens::tasks::list(&tasks, &svc.settings, hint)).await
}

pub(crate) async fn projects(
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
    page: usize,
) -> Result<(), SiteError> {
    let scope = turn.scope();
    let projects = svc.store.active_projects(scope.as_deref()).await?;
    let screen = screens::projects::list(&projects, page, svc.settings.page_size);
    show(svc, conv, &screen).await
}

pub(crate) async fn project(
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
    project_id: &str,
) -> Result<(), SiteError> {
    if !turn.in_scope(project_id) {
        return Err(SiteError::not_found("project", project_id));
    }
    let progress = svc
        .store
        .project_progress(project_id)
        .await?
        .ok_or_else(|| SiteError::not_found("project", project_id))?;
    show(svc, conv, &screens::projects::detail(turn.surface, &progress)).await
}

pub(crate) async fn settings(svc: &Services, turn: &Turn, conv: &mut Conversation) -> Result<(), SiteError> {
    let screen = screens::settings::notifications(turn.surface, &turn.identity.preferences);
    show(svc, conv, &screen).await
}

/// Flip one notification switch. An unknown key just re-shows the settings.
pub(crate) async fn toggle_preference(
    svc: &Services,
    turn: &mut Turn,
    conv: &mut Conversation,
    key: Option<&str>,
) -> Result<(), SiteError> {
    if let Some(key) = key.and_then(|k| k.parse::<PreferenceKey>().ok()) {
        let enabled = turn.identity.preferences.toggle(key);
        svc.store
            .update_preferences(&turn.identity.user_id, &turn.identity.preferences)
            .await?;
        info!(user_id = %turn.identity.user_id, preference = %key, enabled, "preference toggled");
    }
    settings(svc, turn, conv).await
}

// --- inbox items ---

async fn visible_item(svc: &Services, turn: &Turn, id: i64) -> Result<InboxItem, SiteError> {
    let item = svc
        .store
        .get_inbox(id)
        .await?
        .ok_or_else(|| SiteError::not_found("inbox item", id))?;
    if item.project_id.as_deref().is_some_and(|p| !turn.in_scope(p)) {
        return Err(SiteError::not_found("inbox item", id));
    }
    let roles = turn.inbox_roles();
    if !item.to_roles.iter().any(|r| roles.contains(r)) {
        return Err(SiteError::Forbidden(format!(
            "inbox item {id} is not addressed to {}",
            turn.role
        )));
    }
    Ok(item)
}

/// Open an item; a first view moves it from `new` to `read`.
pub(crate) async fn inbox_open(
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
    id: i64,
) -> Result<(), SiteError> {
    let mut item = visible_item(svc, turn, id).await?;
    if item.status == InboxStatus::New {
        item.status = svc
            .store
            .advance_inbox(id, InboxStatus::Read, &turn.identity.user_id, svc.clock.now())
            .await?;
    }
    show(svc, conv, &screens::inbox::detail(turn.surface, &item, &svc.settings)).await
}

pub(crate) async fn inbox_done(
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
    id: i64,
) -> Result<(), SiteError> {
    let mut item = visible_item(svc, turn, id).await?;
    item.status = svc
        .store
        .advance_inbox(
            id,
            InboxStatus::Processed,
            &turn.identity.user_id,
            svc.clock.now(),
        )
        .await?;
    show(svc, conv, &screens::inbox::detail(turn.surface, &item, &svc.settings)).await
}

// --- approvals ---

async fn visible_approval(
    svc: &Services,
    turn: &Turn,
    id: i64,
) -> Result<sitebot_core::types::Approval, SiteError> {
    let approval = svc
        .store
        .get_approval(id)
        .await?
        .ok_or_else(|| SiteError::not_found("approval", id))?;
    let assigned = approval.assigned_to.as_deref() == Some(turn.identity.user_id.as_str());
    if !(turn.is_manager() || assigned) {
        return Err(SiteError::Forbidden(format!("approval {id} needs a manager")));
    }
    if !turn.in_scope(&approval.project_id) {
        return Err(SiteError::not_found("approval", id));
    }
    Ok(approval)
}

pub(crate) async fn approval_view(
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
    id: i64,
) -> Result<(), SiteError> {
    let approval = visible_approval(svc, turn, id).await?;
    show(
        svc,
        conv,
        &screens::approvals::detail(turn.surface, &approval, &svc.settings),
    )
    .await
}

/// Record a decision. Only the first decision on an approval changes it.
pub(crate) async fn approval_decide(
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
    id: i64,
    decision: Decision,
) -> Result<(), SiteError> {
    visible_approval(svc, turn, id).await?;
    let outcome = svc
        .store
        .decide_approval(id, decision, &turn.identity.user_id, svc.clock.now())
        .await?;
    match &outcome {
        DecisionOutcome::Applied(a) => {
            info!(approval_id = id, status = %a.status, by = %turn.identity.user_id, "approval decided");
        }
        DecisionOutcome::AlreadyDecided(a) => {
            info!(approval_id = id, status = %a.status, "approval was already decided");
        }
    }
    show(svc, conv, &screens::approvals::decided(turn.surface, &outcome)).await
}

// --- tasks ---

/// Move a task forward. Requests that would move it backwards leave it as is.
pub(crate) async fn task_status(
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
    id: i64,
    target: TaskStatus,
) -> Result<(), SiteError> {
    let task = svc
        .store
        .get_task(id)
        .await?
        .ok_or_else(|| SiteError::not_found("task", id))?;
    let assignee = task.assigned_to.as_deref() == Some(turn.identity.user_id.as_str());
    if !(assignee || turn.is_manager()) {
        return Err(SiteError::Forbidden(format!("task {id} is assigned to someone else")));
    }
    let hint = if task.status < target {
        svc.store.set_task_status(id, target, svc.clock.now()).await?;
        info!(task_id = id, status = %target, "task status changed");
        match target {
            TaskStatus::Done => "Task completed.",
            _ => "Task started.",
        }
    } else {
        "Task was already updated."
    };
    tasks(svc, turn, conv, Some(hint)).await
}

// --- alerts ---

async fn visible_alert(
    svc: &Services,
    turn: &Turn,
    id: i64,
) -> Result<sitebot_core::records::Alert, SiteError> {
    let alert = svc
        .store
        .get_alert(id)
        .await?
        .ok_or_else(|| SiteError::not_found("alert", id))?;
    if !turn.in_scope(&alert.project_id) {
        return Err(SiteError::not_found("alert", id));
    }
    Ok(alert)
}

pub(crate) async fn alert_view(
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
    id: i64,
) -> Result<(), SiteError> {
    let alert = visible_alert(svc, turn, id).await?;
    show(svc, conv, &screens::alerts::detail(turn.surface, &alert, &svc.settings)).await
}

pub(crate) async fn alert_resolve(
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
    id: i64,
) -> Result<(), SiteError> {
    let alert = visible_alert(svc, turn, id).await?;
    let creator = alert.created_by.as_deref() == Some(turn.identity.user_id.as_str());
    if !(turn.is_manager() || turn.identity.has_role(Role::Inspector) || creator) {
        return Err(SiteError::Forbidden(format!("alert {id} cannot be resolved by {}", turn.role)));
    }
    if svc
        .store
        .resolve_alert(id, &turn.identity.user_id, svc.clock.now())
        .await?
    {
        info!(alert_id = id, by = %turn.identity.user_id, "alert resolved");
    }
    alert_view(svc, turn, conv, id).await
}

// --- stage acceptance ---

fn require_inspector(turn: &Turn) -> Result<(), SiteError> {
    if !turn.identity.has_role(Role::Inspector) {
        return Err(SiteError::Forbidden(format!(
            "stage acceptance needs the inspector role, caller is {}",
            turn.role
        )));
    }
    Ok(())
}

pub(crate) async fn stages(svc: &Services, turn: &Turn, conv: &mut Conversation) -> Result<(), SiteError> {
    require_inspector(turn)?;
    let scope = turn.scope();
    let pending = svc.store.pending_stages(scope.as_deref(), LIST_LIMIT).await?;
    show(svc, conv, &screens::stages::list(&pending, &svc.settings)).await
}

pub(crate) async fn stage_history(
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
) -> Result<(), SiteError> {
    require_inspector(turn)?;
    let decided = svc
        .store
        .stage_history(&turn.identity.user_id, LIST_LIMIT)
        .await?;
    show(svc, conv, &screens::stages::history(&decided, &svc.settings)).await
}

async fn visible_stage(svc: &Services, turn: &Turn, id: i64) -> Result<StageAcceptance, SiteError> {
    require_inspector(turn)?;
    let stage = svc
        .store
        .get_stage(id)
        .await?
        .ok_or_else(|| SiteError::not_found("stage", id))?;
    if !turn.in_scope(&stage.project_id) {
        return Err(SiteError::not_found("stage", id));
    }
    Ok(stage)
}

/// Accept or reject a stage. Only the first verdict changes it.
pub(crate) async fn stage_decide(
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
    id: i64,
    verdict: Verdict,
) -> Result<(), SiteError> {
    visible_stage(svc, turn, id).await?;
    let outcome = svc
        .store
        .decide_stage(id, verdict, &turn.identity.user_id, svc.clock.now())
        .await?;
    match &outcome {
        StageOutcome::Applied(s) => {
            info!(stage_id = id, status = %s.status, by = %turn.identity.user_id, "stage decided");
        }
        StageOutcome::AlreadyDecided(s) => {
            info!(stage_id = id, status = %s.status, "stage was already decided");
        }
    }
    show(svc, conv, &screens::stages::decided(&outcome)).await
}
