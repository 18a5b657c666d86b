// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound update dispatcher.
//!
//! Every update is handled to completion and never fails outward: callbacks
//! are acknowledged first, unlinked chats get the link screen, and handler
//! errors are turned into a screen after being logged.

use std::sync::Arc;

use sitebot_core::records::{TaskStatus, Verdict};
use sitebot_core::types::{ChatEvent, Decision};
use sitebot_core::{ChatTransport, Clock, SiteError, StorageAdapter};
use tracing::{debug, error, info, warn};

use crate::actions::{self, Services, Turn};
use crate::callback::Callback;
use crate::flows::engine::{self, EXPIRED};
use crate::flows::{FlowKind, Reply};
use crate::render::Renderer;
use crate::roles::{MenuAction, Surface};
use crate::router::{
    AlertAction, ApprovalAction, FlowAction, InboxAction, ProjectAction, Route, Router, StageAction,
    TaskAction,
};
use crate::screens::common;
use crate::session::{Conversation, SessionManager};
use crate::settings::WorkflowSettings;

const IDLE_HINT: &str = "Choose an action from the menu.";
const IDLE_FILE_HINT: &str = "To send files, start a photo report or a document from the menu.";
const NOT_ON_MENU: &str = "That option is not on your menu.";
const UNKNOWN_COMMAND: &str = "Unknown command. Send /help for the list.";
const FOREMEN_ONLY: &str = "Progress reports are filed by foremen.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Menu,
    Help,
    Projects,
    Settings,
    Tasks,
    Cancel,
    Report,
    MyId,
    Unknown,
}

/// `/name[@bot] [args]` to a command; `None` for plain text.
fn parse_command(text: &str) -> Option<Command> {
    let word = text.strip_prefix('/')?.split_whitespace().next().unwrap_or("");
    let name = word.split('@').next().unwrap_or("").to_ascii_lowercase();
    Some(match name.as_str() {
        "start" => Command::Start,
        "menu" => Command::Menu,
        "help" => Command::Help,
        "projects" => Command::Projects,
        "settings" => Command::Settings,
        "tasks" => Command::Tasks,
        "cancel" => Command::Cancel,
        "report" => Command::Report,
        "myid" => Command::MyId,
        _ => Command::Unknown,
    })
}

fn flow_for(action: MenuAction) -> Option<FlowKind> {
    match action {
        MenuAction::Send => Some(FlowKind::Document),
        MenuAction::Report => Some(FlowKind::Report),
        MenuAction::Photo => Some(FlowKind::Photo),
        MenuAction::Log => Some(FlowKind::DailyLog),
        MenuAction::NewAlert => Some(FlowKind::Alert),
        _ => None,
    }
}

/// The flow value carried by a `flow:pick` or `flow:toggle` token.
fn flow_value(cb: &Callback<'_>) -> String {
    match (cb.id, cb.extra) {
        (Some(id), Some(extra)) => format!("{id}:{extra}"),
        (Some(id), None) => id.to_string(),
        _ => String::new(),
    }
}

fn entity_id(cb: &Callback<'_>, entity: &'static str) -> Result<i64, SiteError> {
    cb.numeric_id()
        .ok_or_else(|| SiteError::not_found(entity, cb.id.unwrap_or("")))
}

pub struct Dispatcher {
    svc: Services,
    router: Router,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn StorageAdapter>,
        transport: Arc<dyn ChatTransport>,
        clock: Arc<dyn Clock>,
        settings: WorkflowSettings,
    ) -> Self {
        let sessions = SessionManager::new(store.clone(), clock.clone(), settings.session_ttl);
        Self {
            svc: Services {
                store,
                renderer: Renderer::new(transport),
                sessions,
                clock,
                settings,
            },
            router: Router::new(),
        }
    }

    /// Handle one inbound update.
    pub async fn handle(&self, event: ChatEvent) {
        let chat_id = event.chat_id();
        if let ChatEvent::Callback { callback_id, .. } = &event {
            self.svc.renderer.acknowledge(callback_id).await;
        }
        if let Err(e) = self.process(event).await {
            error!(chat_id, error = %e, "update handling failed");
        }
    }

    async fn process(&self, event: ChatEvent) -> Result<(), SiteError> {
        let chat_id = event.chat_id();
        let Some(identity) = self.svc.store.identity_by_chat(chat_id).await? else {
            info!(chat_id, "update from unlinked chat");
            let mut pinned = None;
            let screen = common::link_account(chat_id, &self.svc.settings.bot_name);
            return self.svc.renderer.show(chat_id, &mut pinned, &screen).await;
        };
        let mut turn = Turn::new(identity);
        let mut conv = self.svc.sessions.load(chat_id, &turn.identity.user_id).await?;

        match self.route(&mut turn, &mut conv, event).await {
            Ok(()) => Ok(()),
            Err(e) => self.recover(&turn, &mut conv, e).await,
        }
    }

    async fn recover(
        &self,
        turn: &Turn,
        conv: &mut Conversation,
        e: SiteError,
    ) -> Result<(), SiteError> {
        let screen = match &e {
            SiteError::NotFound { entity, id } => {
                info!(chat_id = conv.chat_id, entity, id, "record not found");
                common::not_found(entity)
            }
            SiteError::Forbidden(reason) => {
                warn!(chat_id = conv.chat_id, role = %turn.role, reason, "action denied");
                common::denied()
            }
            _ => {
                error!(
                    chat_id = conv.chat_id,
                    user_id = %turn.identity.user_id,
                    state = ?conv.state(),
                    error = %e,
                    "handler failed"
                );
                if conv.flow.is_some() {
                    engine::abandon(&self.svc, conv).await?;
                }
                common::failure()
            }
        };
        actions::show(&self.svc, conv, &screen).await
    }

    async fn route(
        &self,
        turn: &mut Turn,
        conv: &mut Conversation,
        event: ChatEvent,
    ) -> Result<(), SiteError> {
        let svc = &self.svc;
        match event {
            ChatEvent::Text {
                message_id, text, ..
            } => {
                let text = text.trim();
                if let Some(command) = parse_command(text) {
                    svc.renderer.discard(conv.chat_id, message_id).await;
                    return self.command(turn, conv, command).await;
                }
                if conv.flow.is_none() {
                    return actions::show_menu(svc, turn, conv, Some(IDLE_HINT)).await;
                }
                svc.renderer.discard(conv.chat_id, message_id).await;
                engine::answer(svc, turn, conv, Reply::Text(text.to_string())).await
            }
            ChatEvent::Attachment { attachment, .. } => {
                if conv.flow.is_none() {
                    return actions::show_menu(svc, turn, conv, Some(IDLE_FILE_HINT)).await;
                }
                let reference = svc.renderer.file_reference(&attachment.file_id).await;
                engine::answer(svc, turn, conv, Reply::File(reference)).await
            }
            ChatEvent::Callback { data, .. } => self.callback(turn, conv, &data).await,
        }
    }

    async fn command(
        &self,
        turn: &Turn,
        conv: &mut Conversation,
        command: Command,
    ) -> Result<(), SiteError> {
        let svc = &self.svc;
        debug!(chat_id = conv.chat_id, ?command, "command");
        match command {
            Command::Start | Command::Menu => {
                engine::abandon(svc, conv).await?;
                actions::replace_with_menu(svc, turn, conv).await
            }
            Command::Help => {
                engine::abandon(svc, conv).await?;
                let screen = common::help(&svc.settings.bot_name, turn.surface);
                actions::show(svc, conv, &screen).await
            }
            Command::Projects => {
                engine::abandon(svc, conv).await?;
                actions::projects(svc, turn, conv, 0).await
            }
            Command::Settings => {
                engine::abandon(svc, conv).await?;
                actions::settings(svc, turn, conv).await
            }
            Command::Tasks => {
                engine::abandon(svc, conv).await?;
                actions::tasks(svc, turn, conv, None).await
            }
            Command::Cancel => engine::cancel(svc, turn, conv).await,
            Command::Report => {
                if turn.surface == Surface::Foreman {
                    engine::start(svc, turn, conv, FlowKind::Report).await
                } else {
                    actions::show_menu(svc, turn, conv, Some(FOREMEN_ONLY)).await
                }
            }
            Command::MyId => {
                let screen = common::my_id(conv.chat_id, &turn.identity.user_id);
                actions::show(svc, conv, &screen).await
            }
            Command::Unknown => actions::show_menu(svc, turn, conv, Some(UNKNOWN_COMMAND)).await,
        }
    }

    async fn callback(
        &self,
        turn: &mut Turn,
        conv: &mut Conversation,
        data: &str,
    ) -> Result<(), SiteError> {
        let svc = &self.svc;
        let Some(cb) = Callback::parse(data) else {
            debug!(chat_id = conv.chat_id, data, "malformed callback ignored");
            return Ok(());
        };
        let Some(route) = self.router.resolve(&cb) else {
            debug!(chat_id = conv.chat_id, data, "unrouted callback ignored");
            return Ok(());
        };

        if let Route::Flow(action) = route {
            if conv.flow.is_none() {
                return actions::show_menu(svc, turn, conv, Some(EXPIRED)).await;
            }
            let reply = match action {
                FlowAction::Pick => Reply::Pick(flow_value(&cb)),
                FlowAction::Toggle => Reply::Toggle(flow_value(&cb)),
                FlowAction::Done => Reply::Done,
                FlowAction::Skip => Reply::Skip,
                FlowAction::Confirm => Reply::Confirm,
                FlowAction::Cancel => return engine::cancel(svc, turn, conv).await,
            };
            return engine::answer(svc, turn, conv, reply).await;
        }

        // Leaving a flow through any other button abandons it.
        if conv.flow.is_some() {
            engine::abandon(svc, conv).await?;
        }

        match route {
            Route::Home => actions::show_menu(svc, turn, conv, None).await,
            Route::Menu(surface) => {
                if surface != turn.surface {
                    info!(
                        chat_id = conv.chat_id,
                        token = data,
                        own = turn.surface.prefix(),
                        "menu token for another role"
                    );
                    return actions::show_menu(svc, turn, conv, None).await;
                }
                match cb.action.parse::<MenuAction>() {
                    Ok(action) if surface.offers(action) => {
                        self.menu_action(turn, conv, action, cb.id).await
                    }
                    _ => actions::show_menu(svc, turn, conv, Some(NOT_ON_MENU)).await,
                }
            }
            Route::Approval(action) => {
                let id = entity_id(&cb, "approval")?;
                match action {
                    ApprovalAction::View => actions::approval_view(svc, turn, conv, id).await,
                    ApprovalAction::Approve => {
                        actions::approval_decide(svc, turn, conv, id, Decision::Approve).await
                    }
                    ApprovalAction::Reject => {
                        actions::approval_decide(svc, turn, conv, id, Decision::Reject).await
                    }
                }
            }
            Route::Inbox(action) => {
                let id = entity_id(&cb, "inbox item")?;
                match action {
                    InboxAction::Open => actions::inbox_open(svc, turn, conv, id).await,
                    InboxAction::Done => actions::inbox_done(svc, turn, conv, id).await,
                }
            }
            Route::Task(action) => {
                let id = entity_id(&cb, "task")?;
                let target = match action {
                    TaskAction::Start => TaskStatus::InProgress,
                    TaskAction::Done => TaskStatus::Done,
                };
                actions::task_status(svc, turn, conv, id, target).await
            }
            Route::Alert(action) => {
                let id = entity_id(&cb, "alert")?;
                match action {
                    AlertAction::View => actions::alert_view(svc, turn, conv, id).await,
                    AlertAction::Resolve => actions::alert_resolve(svc, turn, conv, id).await,
                }
            }
            Route::Project(ProjectAction::View) => {
                let id = cb.id.ok_or_else(|| SiteError::not_found("project", ""))?;
                actions::project(svc, turn, conv, id).await
            }
            Route::Project(ProjectAction::Page) => {
                let page = cb.id.and_then(|p| p.parse().ok()).unwrap_or(0);
                actions::projects(svc, turn, conv, page).await
            }
            Route::Stage(action) => {
                let id = entity_id(&cb, "stage")?;
                let verdict = match action {
                    StageAction::Accept => Verdict::Accept,
                    StageAction::Reject => Verdict::Reject,
                };
                actions::stage_decide(svc, turn, conv, id, verdict).await
            }
            Route::Flow(_) => Ok(()),
        }
    }

    async fn menu_action(
        &self,
        turn: &mut Turn,
        conv: &mut Conversation,
        action: MenuAction,
        arg: Option<&str>,
    ) -> Result<(), SiteError> {
        let svc = &self.svc;
        if let Some(kind) = flow_for(action) {
            return engine::start(svc, turn, conv, kind).await;
        }
        match action {
            MenuAction::Inbox => actions::inbox(svc, turn, conv).await,
            MenuAction::Approvals => actions::approvals(svc, turn, conv).await,
            MenuAction::Alerts => actions::alerts(svc, turn, conv).await,
            MenuAction::Accept => actions::stages(svc, turn, conv).await,
            MenuAction::History => actions::stage_history(svc, turn, conv).await,
            MenuAction::Tasks => actions::tasks(svc, turn, conv, None).await,
            MenuAction::Projects => actions::projects(svc, turn, conv, 0).await,
            MenuAction::Settings => actions::settings(svc, turn, conv).await,
            MenuAction::Notif => actions::toggle_preference(svc, turn, conv, arg).await,
            _ => actions::show_menu(svc, turn, conv, None).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sitebot_core::types::{
        ApprovalKind, Attachment, AttachmentKind, InboxKind, InboxStatus, NewApproval, NewInboxItem,
    };
    use sitebot_core::{Role, types::Priority};
    use sitebot_test_utils::{Outbound, TestHarness};
    use tracing_test::traced_test;

    const FOREMAN_CHAT: i64 = 555;
    const PM_CHAT: i64 = 777;

    async fn setup() -> (TestHarness, Dispatcher) {
        let h = TestHarness::builder().build().await.unwrap();
        h.seed_project("p1", "Tower").await.unwrap();
        h.seed_facade("fa", "p1", "A").await.unwrap();
        h.seed_floor("fa12", "fa", 12, 20, 0).await.unwrap();
        h.seed_user("u1", "Oleg", FOREMAN_CHAT, &[(Role::Foreman2, Some("p1"))])
            .await
            .unwrap();
        h.seed_user("u2", "Anna", PM_CHAT, &[(Role::Pm, None)])
            .await
            .unwrap();
        let dispatcher = Dispatcher::new(
            h.store(),
            h.transport.clone(),
            h.clock.clone(),
            WorkflowSettings::default(),
        );
        (h, dispatcher)
    }

    fn text(chat_id: i64, text: &str) -> ChatEvent {
        ChatEvent::Text {
            chat_id,
            message_id: 1,
            text: text.into(),
        }
    }

    fn press(chat_id: i64, data: &str) -> ChatEvent {
        ChatEvent::Callback {
            chat_id,
            message_id: Some(100),
            callback_id: format!("cb-{data}"),
            data: data.into(),
        }
    }

    #[test]
    fn commands_parse_with_bot_suffix() {
        assert_eq!(parse_command("/start"), Some(Command::Start));
        assert_eq!(parse_command("/Report@sitebot now"), Some(Command::Report));
        assert_eq!(parse_command("/whatever"), Some(Command::Unknown));
        assert_eq!(parse_command("hello"), None);
    }

    #[tokio::test]
    #[traced_test]
    async fn unlinked_chat_gets_link_screen() {
        let (h, dispatcher) = setup().await;
        dispatcher.handle(text(42, "/start")).await;
        assert!(logs_contain("update from unlinked chat"));
        assert!(h.transport.last_text().await.contains("<code>42</code>"));
        assert_eq!(
            h.scalar("SELECT COUNT(*) FROM bot_sessions").await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn start_renders_the_primary_role_menu() {
        let (h, dispatcher) = setup().await;
        dispatcher.handle(text(FOREMAN_CHAT, "/start")).await;
        let buttons = h.transport.last_buttons().await;
        assert_eq!(buttons[0], "f:report");
        assert!(buttons.iter().all(|b| b.starts_with("f:")));
    }

    #[tokio::test]
    async fn callbacks_are_acknowledged_even_when_malformed() {
        let (h, dispatcher) = setup().await;
        dispatcher.handle(press(FOREMAN_CHAT, "garbage")).await;
        dispatcher.handle(press(FOREMAN_CHAT, "zz:top")).await;
        assert_eq!(
            h.transport.answered_callbacks().await,
            vec!["cb-garbage", "cb-zz:top"]
        );
        assert_eq!(h.transport.sent_count().await, 0);
    }

    #[tokio::test]
    async fn foreign_menu_token_shows_own_menu() {
        let (h, dispatcher) = setup().await;
        dispatcher.handle(press(FOREMAN_CHAT, "d:approvals")).await;
        let buttons = h.transport.last_buttons().await;
        assert!(buttons.iter().all(|b| b.starts_with("f:")));
    }

    #[tokio::test]
    async fn idle_text_shows_menu_with_hint() {
        let (h, dispatcher) = setup().await;
        dispatcher.handle(text(FOREMAN_CHAT, "hello?")).await;
        assert!(h.transport.last_text().await.contains(IDLE_HINT));
    }

    #[tokio::test]
    async fn stale_flow_button_shows_expired_hint() {
        let (h, dispatcher) = setup().await;
        dispatcher.handle(press(FOREMAN_CHAT, "flow:confirm")).await;
        assert!(h.transport.last_text().await.contains("expired"));
    }

    #[tokio::test]
    async fn report_command_is_for_foremen() {
        let (h, dispatcher) = setup().await;
        dispatcher.handle(text(PM_CHAT, "/report")).await;
        assert!(h.transport.last_text().await.contains(FOREMEN_ONLY));

        dispatcher.handle(text(FOREMAN_CHAT, "/report")).await;
        assert_eq!(
            h.transport.last_buttons().await,
            vec!["flow:pick:fa", "flow:cancel"]
        );
    }

    #[tokio::test]
    async fn file_outside_a_flow_is_not_stored() {
        let (h, dispatcher) = setup().await;
        dispatcher
            .handle(ChatEvent::Attachment {
                chat_id: FOREMAN_CHAT,
                message_id: 3,
                attachment: Attachment {
                    kind: AttachmentKind::Photo,
                    file_id: "AgAD".into(),
                    file_name: None,
                },
                caption: None,
            })
            .await;
        assert!(h.transport.last_text().await.contains(IDLE_FILE_HINT));
        assert_eq!(h.scalar("SELECT COUNT(*) FROM photo_reports").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn opening_an_inbox_item_marks_it_read() {
        let (h, dispatcher) = setup().await;
        dispatcher.handle(text(FOREMAN_CHAT, "/start")).await;
        dispatcher.handle(press(FOREMAN_CHAT, "f:alert")).await;
        dispatcher.handle(press(FOREMAN_CHAT, "flow:pick:high")).await;
        dispatcher.handle(text(FOREMAN_CHAT, "Crane is down")).await;
        dispatcher.handle(press(FOREMAN_CHAT, "flow:skip")).await;
        dispatcher.handle(press(FOREMAN_CHAT, "flow:confirm")).await;
        assert_eq!(h.scalar("SELECT COUNT(*) FROM alerts").await.unwrap(), 1);

        let store = h.store();
        let items = store.list_inbox(None, &[Role::Pm], 10).await.unwrap();
        assert_eq!(items.len(), 1);
        let id = items[0].id;

        dispatcher.handle(press(PM_CHAT, &format!("inbox:open:{id}"))).await;
        assert_eq!(store.get_inbox(id).await.unwrap().unwrap().status, InboxStatus::Read);
        dispatcher.handle(press(PM_CHAT, &format!("inbox:done:{id}"))).await;
        dispatcher.handle(press(PM_CHAT, &format!("inbox:open:{id}"))).await;
        assert_eq!(
            store.get_inbox(id).await.unwrap().unwrap().status,
            InboxStatus::Processed
        );
        assert_eq!(
            h.scalar(
                "SELECT COUNT(*) FROM bot_audit_log
                 WHERE action = 'inbox:processed' AND user_id = 'u2'"
            )
            .await
            .unwrap(),
            1
        );

        // The foreman is not a recipient.
        dispatcher.handle(press(FOREMAN_CHAT, &format!("inbox:open:{id}"))).await;
        assert!(h.transport.last_text().await.contains("not available"));
    }

    #[tokio::test]
    async fn inbox_items_from_other_projects_stay_hidden() {
        let (h, dispatcher) = setup().await;
        h.seed_project("p2", "Harbour").await.unwrap();
        let store = h.store();
        let item = |project: &str, title: &str| NewInboxItem {
            project_id: Some(project.into()),
            from_role: Role::Pm,
            from_user_id: Some("u2".into()),
            to_roles: vec![Role::Foreman2],
            kind: InboxKind::Document,
            title: title.into(),
            description: None,
            file_reference: None,
        };
        let own = store
            .post_inbox(&item("p1", "Anchor plan"), h.clock.now())
            .await
            .unwrap();
        let foreign = store
            .post_inbox(&item("p2", "Harbour drawings"), h.clock.now())
            .await
            .unwrap();

        dispatcher.handle(text(FOREMAN_CHAT, "/start")).await;
        assert!(h.transport.last_text().await.contains("Unread in inbox: <b>1</b>"));

        dispatcher.handle(press(FOREMAN_CHAT, "f:inbox")).await;
        let buttons = h.transport.last_buttons().await;
        assert!(buttons.contains(&format!("inbox:open:{own}")));
        assert!(!buttons.contains(&format!("inbox:open:{foreign}")));
        assert!(!h.transport.last_text().await.contains("Harbour drawings"));

        dispatcher.handle(press(FOREMAN_CHAT, &format!("inbox:open:{foreign}"))).await;
        let reply = h.transport.last_text().await;
        assert!(reply.contains("not found"));
        assert!(!reply.contains("Harbour drawings"));
        dispatcher.handle(press(FOREMAN_CHAT, &format!("inbox:done:{foreign}"))).await;
        assert!(h.transport.last_text().await.contains("not found"));
        assert_eq!(
            store.get_inbox(foreign).await.unwrap().unwrap().status,
            InboxStatus::New
        );
    }

    #[tokio::test]
    async fn approval_is_decided_once() {
        let (h, dispatcher) = setup().await;
        let store = h.store();
        let id = store
            .create_approval(
                &NewApproval {
                    project_id: "p1".into(),
                    kind: ApprovalKind::Budget,
                    title: "Crane rental".into(),
                    description: None,
                    level: 1,
                    assigned_to: None,
                    requested_by: Some("u1".into()),
                    entity_id: None,
                },
                h.clock.now(),
            )
            .await
            .unwrap();

        dispatcher.handle(press(FOREMAN_CHAT, &format!("appr:yes:{id}"))).await;
        assert!(h.transport.last_text().await.contains("not available"));

        dispatcher.handle(press(PM_CHAT, &format!("appr:yes:{id}"))).await;
        assert!(h.transport.last_text().await.contains("Approved"));
        dispatcher.handle(press(PM_CHAT, &format!("appr:no:{id}"))).await;
        assert!(h.transport.last_text().await.contains("Already decided"));

        let approval = store.get_approval(id).await.unwrap().unwrap();
        assert_eq!(approval.decided_by.as_deref(), Some("u2"));
        assert_eq!(approval.status.to_string(), "approved");
    }

    #[tokio::test]
    async fn inspector_decides_stages_in_scope() {
        const INSPECTOR_CHAT: i64 = 888;
        let (h, dispatcher) = setup().await;
        h.seed_user("u3", "Igor", INSPECTOR_CHAT, &[(Role::Inspector, Some("p1"))])
            .await
            .unwrap();
        h.seed_project("p2", "Harbour").await.unwrap();
        h.seed_facade("fb", "p2", "B").await.unwrap();
        h.seed_floor("fb3", "fb", 3, 10, 0).await.unwrap();
        let now = h.clock.now();
        let own = h.seed_stage("p1", Some("fa12"), "Brackets", now).await.unwrap();
        let foreign = h.seed_stage("p2", Some("fb3"), "Frame", now).await.unwrap();

        dispatcher.handle(press(INSPECTOR_CHAT, "i:accept")).await;
        let buttons = h.transport.last_buttons().await;
        assert!(buttons.contains(&format!("stage:yes:{own}")));
        assert!(!buttons.contains(&format!("stage:yes:{foreign}")));
        assert!(h.transport.last_text().await.contains("A · floor 12"));

        // Only inspectors decide stages.
        dispatcher.handle(press(PM_CHAT, &format!("stage:yes:{own}"))).await;
        assert!(h.transport.last_text().await.contains("not available"));

        dispatcher.handle(press(INSPECTOR_CHAT, &format!("stage:yes:{foreign}"))).await;
        assert!(h.transport.last_text().await.contains("not found"));

        dispatcher.handle(press(INSPECTOR_CHAT, &format!("stage:yes:{own}"))).await;
        assert!(h.transport.last_text().await.contains("Stage accepted"));
        dispatcher.handle(press(INSPECTOR_CHAT, &format!("stage:no:{own}"))).await;
        assert!(h.transport.last_text().await.contains("Already decided"));

        assert_eq!(
            h.scalar("SELECT COUNT(*) FROM stage_acceptance WHERE status = 'pending_inspector'")
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            h.scalar(
                "SELECT COUNT(*) FROM bot_audit_log
                 WHERE action = 'inspection:accepted' AND user_id = 'u3'"
            )
            .await
            .unwrap(),
            1
        );

        dispatcher.handle(press(INSPECTOR_CHAT, "i:history")).await;
        let history = h.transport.last_text().await;
        assert!(history.contains("✅ Brackets"));
        assert!(!history.contains("Frame"));
    }

    #[tokio::test]
    async fn document_type_brings_its_recipients() {
        let (h, dispatcher) = setup().await;
        dispatcher.handle(press(FOREMAN_CHAT, "f:send")).await;
        // The only project is picked automatically; the foreman catalogue follows.
        let buttons = h.transport.last_buttons().await;
        assert!(buttons.contains(&"flow:pick:f_hidden".to_string()));
        assert!(!buttons.contains(&"flow:pick:pm_permits".to_string()));

        dispatcher.handle(press(FOREMAN_CHAT, "flow:pick:f_hidden")).await;
        assert!(h.transport.last_text().await.contains("Hidden works act"));
        dispatcher.handle(press(FOREMAN_CHAT, "flow:done")).await;
        dispatcher.handle(press(FOREMAN_CHAT, "flow:skip")).await;
        dispatcher.handle(press(FOREMAN_CHAT, "flow:skip")).await;
        dispatcher.handle(press(FOREMAN_CHAT, "flow:confirm")).await;
        let sent = h.transport.last_text().await;
        assert!(sent.contains("Document sent"));
        assert!(sent.contains("To: PTO engineer, Project manager"));

        let store = h.store();
        for role in [Role::Pto, Role::Pm] {
            let items = store.list_inbox(None, &[role], 10).await.unwrap();
            assert_eq!(items.len(), 1, "{role}");
            assert_eq!(items[0].title, "Hidden works act");
        }
        assert_eq!(
            h.scalar(
                "SELECT COUNT(*) FROM bot_audit_log
                 WHERE action = 'doc:sent' AND user_id = 'u1' AND chat_id = 555"
            )
            .await
            .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn task_buttons_respect_the_assignee() {
        let (h, dispatcher) = setup().await;
        let deadline = h.clock.now() + Duration::days(1);
        let task = h.seed_task("p1", "Mount brackets", Some("u1"), Some(deadline)).await.unwrap();
        let other = h.seed_task("p1", "Order bolts", Some("u9"), None).await.unwrap();

        dispatcher.handle(press(FOREMAN_CHAT, &format!("task:start:{task}"))).await;
        assert!(h.transport.last_text().await.contains("Task started"));
        assert_eq!(
            h.transport.last_buttons().await,
            vec![format!("task:done:{task}"), "nav:home".to_string()]
        );

        dispatcher.handle(press(FOREMAN_CHAT, &format!("task:done:{other}"))).await;
        assert!(h.transport.last_text().await.contains("not available"));
        let untouched = h.store().get_task(other).await.unwrap().unwrap();
        assert_eq!(untouched.status, TaskStatus::Todo);
    }

    #[tokio::test]
    async fn missing_records_render_not_found() {
        let (h, dispatcher) = setup().await;
        dispatcher.handle(press(PM_CHAT, "alert:view:999")).await;
        assert!(h.transport.last_text().await.contains("not found"));
        dispatcher.handle(press(FOREMAN_CHAT, "proj:view:p2")).await;
        assert!(h.transport.last_text().await.contains("not found"));
    }

    #[tokio::test]
    async fn alert_resolution_by_creator() {
        let (h, dispatcher) = setup().await;
        let id = h
            .seed_alert("p1", "Scaffold loose", Priority::High, h.clock.now())
            .await
            .unwrap();
        dispatcher.handle(press(PM_CHAT, &format!("alert:resolve:{id}"))).await;
        let alert = h.store().get_alert(id).await.unwrap().unwrap();
        assert!(alert.is_resolved);
        assert!(h.transport.last_text().await.contains("Resolved"));
    }

    #[tokio::test]
    async fn preference_toggle_persists() {
        let (h, dispatcher) = setup().await;
        dispatcher
            .handle(press(FOREMAN_CHAT, "f:notif:report_reminders"))
            .await;
        let identity = h.store().identity_by_chat(FOREMAN_CHAT).await.unwrap().unwrap();
        assert!(!identity.preferences.report_reminders);
        assert!(h.transport.last_text().await.contains("🔕 Report reminders"));
    }

    #[tokio::test]
    async fn menu_leaves_an_abandoned_flow() {
        let (h, dispatcher) = setup().await;
        dispatcher.handle(text(FOREMAN_CHAT, "/report")).await;
        dispatcher.handle(press(FOREMAN_CHAT, "f:inbox")).await;
        assert!(
            h.transport
                .calls()
                .await
                .iter()
                .any(|c| matches!(c, Outbound::Edited { text, .. } if text.contains("Inbox")))
        );
        dispatcher.handle(text(FOREMAN_CHAT, "18")).await;
        assert!(h.transport.last_text().await.contains(IDLE_HINT));
    }
}
