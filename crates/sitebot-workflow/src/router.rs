// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Declarative callback routing table.
//!
//! Exact `namespace:action` keys map to business routes; any other token
//! whose namespace is a surface prefix is a menu token. The table is built
//! once per [`Router`] and never mutated.

use std::collections::HashMap;

use strum::IntoEnumIterator;

use crate::callback::Callback;
use crate::roles::Surface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalAction {
    View,
    Approve,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxAction {
    Open,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Start,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertAction {
    View,
    Resolve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectAction {
    View,
    Page,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageAction {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowAction {
    Pick,
    Toggle,
    Done,
    Skip,
    Confirm,
    Cancel,
}

/// Where a callback goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    /// A `<prefix>:<action>` token of the given surface.
    Menu(Surface),
    Approval(ApprovalAction),
    Inbox(InboxAction),
    Task(TaskAction),
    Alert(AlertAction),
    Project(ProjectAction),
    Stage(StageAction),
    Flow(FlowAction),
}

/// Exact routing keys.
pub const ROUTES: &[(&str, Route)] = &[
    ("nav:home", Route::Home),
    ("appr:view", Route::Approval(ApprovalAction::View)),
    ("appr:yes", Route::Approval(ApprovalAction::Approve)),
    ("appr:no", Route::Approval(ApprovalAction::Reject)),
    ("inbox:open", Route::Inbox(InboxAction::Open)),
    ("inbox:done", Route::Inbox(InboxAction::Done)),
    ("task:start", Route::Task(TaskAction::Start)),
    ("task:done", Route::Task(TaskAction::Done)),
    ("alert:view", Route::Alert(AlertAction::View)),
    ("alert:resolve", Route::Alert(AlertAction::Resolve)),
    ("proj:view", Route::Project(ProjectAction::View)),
    ("proj:page", Route::Project(ProjectAction::Page)),
    ("stage:yes", Route::Stage(StageAction::Accept)),
    ("stage:no", Route::Stage(StageAction::Reject)),
    ("flow:pick", Route::Flow(FlowAction::Pick)),
    ("flow:toggle", Route::Flow(FlowAction::Toggle)),
    ("flow:done", Route::Flow(FlowAction::Done)),
    ("flow:skip", Route::Flow(FlowAction::Skip)),
    ("flow:confirm", Route::Flow(FlowAction::Confirm)),
    ("flow:cancel", Route::Flow(FlowAction::Cancel)),
];

#[derive(Debug, Clone)]
pub struct Router {
    exact: HashMap<&'static str, Route>,
    menus: HashMap<&'static str, Surface>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            exact: ROUTES.iter().copied().collect(),
            menus: Surface::iter().map(|s| (s.prefix(), s)).collect(),
        }
    }

    pub fn resolve(&self, callback: &Callback<'_>) -> Option<Route> {
        if let Some(route) = self.exact.get(callback.key().as_str()) {
            return Some(*route);
        }
        self.menus.get(callback.namespace).map(|s| Route::Menu(*s))
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
