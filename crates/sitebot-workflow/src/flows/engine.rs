// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drives a [`Flow`] through its steps against the persisted conversation.

use sitebot_core::types::IDLE_STATE;
use sitebot_core::SiteError;
use tracing::{debug, error, info};

use super::{
    Advance, AlertFlow, Answer, DailyLogFlow, DocumentFlow, Flow, FlowContext, FlowCx, FlowKind,
    PhotoFlow, Reply, ReportFlow, validate,
};
use crate::actions::{self, Services, Turn};
use crate::screens::common;
use crate::session::Conversation;

pub(crate) const EXPIRED: &str = "That step has expired. Start again from the menu.";
const CANCELLED: &str = "Cancelled. Nothing was saved.";

fn flow_cx<'a>(svc: &'a Services, turn: &'a Turn) -> FlowCx<'a> {
    FlowCx {
        store: svc.store.as_ref(),
        identity: &turn.identity,
        role: turn.role,
        now: svc.clock.now(),
        settings: &svc.settings,
    }
}

/// Begin a flow from its first step, replacing any flow in progress.
pub(crate) async fn start(
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
    kind: FlowKind,
) -> Result<(), SiteError> {
    discard_notice(svc, conv).await;
    info!(chat_id = conv.chat_id, flow = %kind, "flow started");
    match kind {
        FlowKind::Document => fresh(&DocumentFlow, svc, turn, conv).await,
        FlowKind::Photo => fresh(&PhotoFlow, svc, turn, conv).await,
        FlowKind::DailyLog => fresh(&DailyLogFlow, svc, turn, conv).await,
        FlowKind::Alert => fresh(&AlertFlow, svc, turn, conv).await,
        FlowKind::Report => fresh(&ReportFlow, svc, turn, conv).await,
    }
}

/// Feed one reply to the active flow. Without one, the menu is shown with a hint.
pub(crate) async fn answer(
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
    reply: Reply,
) -> Result<(), SiteError> {
    let Some(flow) = conv.flow.clone() else {
        return actions::show_menu(svc, turn, conv, Some(EXPIRED)).await;
    };
    match flow {
        FlowContext::Document { step, draft } => {
            feed(&DocumentFlow, svc, turn, conv, step, draft, reply).await
        }
        FlowContext::Photo { step, draft } => {
            feed(&PhotoFlow, svc, turn, conv, step, draft, reply).await
        }
        FlowContext::DailyLog { step, draft } => {
            feed(&DailyLogFlow, svc, turn, conv, step, draft, reply).await
        }
        FlowContext::Alert { step, draft } => {
            feed(&AlertFlow, svc, turn, conv, step, draft, reply).await
        }
        FlowContext::Report { step, draft } => {
            feed(&ReportFlow, svc, turn, conv, step, draft, reply).await
        }
    }
}

/// Abandon the active flow and return to the menu. Nothing is written.
pub(crate) async fn cancel(
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
) -> Result<(), SiteError> {
    if let Some(state) = conv.state() {
        info!(chat_id = conv.chat_id, %state, "flow cancelled");
    }
    abandon(svc, conv).await?;
    actions::show_menu(svc, turn, conv, Some(CANCELLED)).await
}

/// Drop the active flow, if any, without rendering.
pub(crate) async fn abandon(svc: &Services, conv: &mut Conversation) -> Result<(), SiteError> {
    discard_notice(svc, conv).await;
    svc.sessions.clear(conv).await
}

async fn discard_notice(svc: &Services, conv: &Conversation) {
    if let Some(FlowContext::Photo { draft, .. }) = &conv.flow {
        if let Some(id) = draft.notice_message_id {
            svc.renderer.discard(conv.chat_id, id).await;
        }
    }
}

async fn fresh<F: Flow>(
    flow: &F,
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
) -> Result<(), SiteError> {
    enter(flow, svc, turn, conv, flow.first(), F::Draft::default(), None).await
}

/// Render `step` and persist it as the current state.
///
/// A step whose only option is auto-pickable is answered on the user's behalf.
async fn enter<F: Flow>(
    flow: &F,
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
    mut step: F::Step,
    mut draft: F::Draft,
    error: Option<&str>,
) -> Result<(), SiteError> {
    let cx = flow_cx(svc, turn);
    let mut prompt = flow.prompt(&cx, step, &draft).await?;
    while let Some(choice) = prompt.only_choice().cloned() {
        match flow.accept(step, &mut draft, Answer::Picked(choice)) {
            Advance::To(next) => {
                debug!(from = %step, to = %next, "auto-picked the only option");
                step = next;
                prompt = flow.prompt(&cx, step, &draft).await?;
            }
            _ => break,
        }
    }
    conv.flow = Some(flow.pack(step, draft));
    svc.renderer
        .show(conv.chat_id, &mut conv.pinned, &prompt.render(error))
        .await?;
    svc.sessions.save(conv).await
}

async fn feed<F: Flow>(
    flow: &F,
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
    step: F::Step,
    draft: F::Draft,
    reply: Reply,
) -> Result<(), SiteError> {
    let cx = flow_cx(svc, turn);
    let prompt = flow.prompt(&cx, step, &draft).await?;
    let answer = match validate(&prompt.input, reply) {
        Ok(answer) => answer,
        Err(message) => {
            debug!(%step, reason = message, "reply rejected");
            return actions::show(svc, conv, &prompt.render(Some(message))).await;
        }
    };

    let was_file = matches!(answer, Answer::File(_));
    let mut next = draft.clone();
    match flow.accept(step, &mut next, answer) {
        Advance::To(to) => {
            if was_file {
                refresh_notice(flow, svc, conv, &mut next).await?;
            }
            enter(flow, svc, turn, conv, to, next, None).await
        }
        Advance::Stay => {
            if was_file {
                refresh_notice(flow, svc, conv, &mut next).await?;
            }
            enter(flow, svc, turn, conv, step, next, None).await
        }
        Advance::Invalid(message) => {
            debug!(%step, reason = %message, "answer rejected");
            actions::show(svc, conv, &prompt.render(Some(&message))).await
        }
        Advance::Commit => commit(flow, svc, turn, conv, next).await,
    }
}

/// Replace the per-file notice with one reflecting the new count.
async fn refresh_notice<F: Flow>(
    flow: &F,
    svc: &Services,
    conv: &Conversation,
    draft: &mut F::Draft,
) -> Result<(), SiteError> {
    let Some(text) = flow.notice(draft) else {
        return Ok(());
    };
    if let Some(slot) = flow.notice_slot(draft) {
        if let Some(old) = slot.take() {
            svc.renderer.discard(conv.chat_id, old).await;
        }
        *slot = Some(svc.renderer.notice(conv.chat_id, &text).await?);
    }
    Ok(())
}

async fn commit<F: Flow>(
    flow: &F,
    svc: &Services,
    turn: &Turn,
    conv: &mut Conversation,
    mut draft: F::Draft,
) -> Result<(), SiteError> {
    if let Some(slot) = flow.notice_slot(&mut draft) {
        if let Some(id) = slot.take() {
            svc.renderer.discard(conv.chat_id, id).await;
        }
    }
    let state = conv
        .state()
        .map(|s| s.to_string())
        .unwrap_or_else(|| IDLE_STATE.to_string());
    let cx = flow_cx(svc, turn);
    let screen = match flow.commit(&cx, &draft).await {
        Ok(screen) => {
            info!(chat_id = conv.chat_id, user_id = %turn.identity.user_id, %state, "flow committed");
            screen
        }
        Err(e) => {
            error!(
                chat_id = conv.chat_id,
                user_id = %turn.identity.user_id,
                %state,
                error = %e,
                "flow commit failed"
            );
            common::failure()
        }
    };
    svc.sessions.clear(conv).await?;
    actions::show(svc, conv, &screen).await
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use sitebot_core::Role;
    use sitebot_test_utils::TestHarness;

    use super::*;
    use crate::flows::{FlowState, PhotoStep, ReportStep};
    use crate::render::Renderer;
    use crate::session::SessionManager;
    use crate::settings::WorkflowSettings;

    async fn setup() -> (TestHarness, Services, Turn) {
        let h = TestHarness::builder().build().await.unwrap();
        h.seed_project("p1", "Tower").await.unwrap();
        h.seed_facade("fa", "p1", "A").await.unwrap();
        h.seed_facade("fb", "p1", "B").await.unwrap();
        h.seed_floor("fa12", "fa", 12, 20, 0).await.unwrap();
        h.seed_user("u1", "Oleg", 555, &[(Role::Foreman2, None)])
            .await
            .unwrap();
        let svc = Services {
            store: h.store(),
            renderer: Renderer::new(h.transport.clone()),
            sessions: SessionManager::new(h.store(), h.clock.clone(), Duration::hours(8)),
            clock: h.clock.clone(),
            settings: WorkflowSettings::default(),
        };
        let identity = h.store().identity_by_chat(555).await.unwrap().unwrap();
        (h, svc, Turn::new(identity))
    }

    #[tokio::test]
    async fn single_project_is_picked_automatically() {
        let (h, svc, turn) = setup().await;
        let mut conv = Conversation::idle(555, "u1");
        start(&svc, &turn, &mut conv, FlowKind::Report).await.unwrap();

        assert_eq!(conv.state(), Some(FlowState::Report(ReportStep::Facade)));
        assert_eq!(
            h.transport.last_buttons().await,
            vec!["flow:pick:fa", "flow:pick:fb", "flow:cancel"]
        );
        let saved = svc.sessions.load(555, "u1").await.unwrap();
        assert_eq!(saved, conv);
    }

    #[tokio::test]
    async fn invalid_reply_keeps_state_and_shows_error() {
        let (h, svc, turn) = setup().await;
        let mut conv = Conversation::idle(555, "u1");
        start(&svc, &turn, &mut conv, FlowKind::Report).await.unwrap();
        let before = conv.clone();

        answer(&svc, &turn, &mut conv, Reply::Text("A".into()))
            .await
            .unwrap();
        assert_eq!(conv, before);
        assert!(h.transport.last_text().await.contains("⚠️"));
        assert_eq!(svc.sessions.load(555, "u1").await.unwrap(), before);
    }

    #[tokio::test]
    async fn cancel_writes_nothing() {
        let (h, svc, turn) = setup().await;
        let mut conv = Conversation::idle(555, "u1");
        start(&svc, &turn, &mut conv, FlowKind::Report).await.unwrap();
        answer(&svc, &turn, &mut conv, Reply::Pick("fa".into())).await.unwrap();
        answer(&svc, &turn, &mut conv, Reply::Pick("fa12".into())).await.unwrap();
        answer(&svc, &turn, &mut conv, Reply::Text("5".into())).await.unwrap();
        assert_eq!(conv.state(), Some(FlowState::Report(ReportStep::Confirm)));

        cancel(&svc, &turn, &mut conv).await.unwrap();
        assert!(conv.flow.is_none());
        assert_eq!(h.scalar("SELECT COUNT(*) FROM plan_fact").await.unwrap(), 0);
        assert!(h.transport.last_text().await.contains("Cancelled"));
    }

    #[tokio::test]
    async fn failed_commit_clears_the_flow() {
        let (h, svc, turn) = setup().await;
        let mut conv = Conversation::idle(555, "u1");
        start(&svc, &turn, &mut conv, FlowKind::Report).await.unwrap();
        answer(&svc, &turn, &mut conv, Reply::Pick("fa".into())).await.unwrap();
        answer(&svc, &turn, &mut conv, Reply::Pick("fa12".into())).await.unwrap();
        answer(&svc, &turn, &mut conv, Reply::Text("5".into())).await.unwrap();

        h.execute("DELETE FROM floors").await.unwrap();
        answer(&svc, &turn, &mut conv, Reply::Confirm).await.unwrap();

        assert!(conv.flow.is_none());
        assert!(h.transport.last_text().await.contains("Something went wrong"));
        assert_eq!(h.scalar("SELECT COUNT(*) FROM plan_fact").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn photo_notices_are_replaced() {
        let (h, svc, turn) = setup().await;
        let mut conv = Conversation::idle(555, "u1");
        start(&svc, &turn, &mut conv, FlowKind::Photo).await.unwrap();
        assert_eq!(conv.state(), Some(FlowState::Photo(PhotoStep::Kind)));
        answer(&svc, &turn, &mut conv, Reply::Pick("daily".into())).await.unwrap();
        answer(&svc, &turn, &mut conv, Reply::Pick("fa".into())).await.unwrap();
        answer(&svc, &turn, &mut conv, Reply::Pick("fa12".into())).await.unwrap();
        assert_eq!(conv.state(), Some(FlowState::Photo(PhotoStep::Files)));

        answer(&svc, &turn, &mut conv, Reply::File("ref-1".into())).await.unwrap();
        answer(&svc, &turn, &mut conv, Reply::File("ref-2".into())).await.unwrap();

        let Some(FlowContext::Photo { draft, .. }) = &conv.flow else {
            panic!("expected photo flow");
        };
        assert_eq!(draft.files.len(), 2);
        let notice = draft.notice_message_id.unwrap();
        assert_eq!(h.transport.deleted().await.len(), 1);

        answer(&svc, &turn, &mut conv, Reply::Done).await.unwrap();
        answer(&svc, &turn, &mut conv, Reply::Skip).await.unwrap();
        answer(&svc, &turn, &mut conv, Reply::Confirm).await.unwrap();
        assert!(h.transport.deleted().await.contains(&notice));
        assert_eq!(
            h.scalar("SELECT COUNT(*) FROM photo_reports WHERE floor_id = 'fa12' AND photo_type = 'daily'")
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            h.scalar("SELECT json_array_length(photo_urls) FROM floors WHERE id = 'fa12'")
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            h.scalar("SELECT COUNT(*) FROM bot_audit_log WHERE action = 'photo:submit' AND chat_id = 555")
                .await
                .unwrap(),
            1
        );
    }
}
