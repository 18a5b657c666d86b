// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed view over the persisted per-chat session.
//!
//! The store keeps a state tag and an opaque JSON context. Here they are
//! decoded into a [`FlowContext`]; a row whose tag and context disagree, or
//! that belongs to another user, is treated as idle.

use std::sync::Arc;

use chrono::Duration;
use sitebot_core::types::{IDLE_STATE, Session};
use sitebot_core::{Clock, SiteError, StorageAdapter};
use tracing::warn;

use crate::flows::{FlowContext, FlowState};

/// The live conversation in one chat.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub chat_id: i64,
    pub user_id: String,
    /// The message screens are rendered onto.
    pub pinned: Option<i64>,
    /// `None` when idle.
    pub flow: Option<FlowContext>,
}

impl Conversation {
    pub fn idle(chat_id: i64, user_id: impl Into<String>) -> Self {
        Self {
            chat_id,
            user_id: user_id.into(),
            pinned: None,
            flow: None,
        }
    }

    pub fn state(&self) -> Option<FlowState> {
        self.flow.as_ref().map(FlowContext::state)
    }
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn StorageAdapter>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn StorageAdapter>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// Load the conversation for `chat_id`. Missing or expired sessions load as idle.
    pub async fn load(&self, chat_id: i64, user_id: &str) -> Result<Conversation, SiteError> {
        let now = self.clock.now();
        let Some(session) = self.store.load_session(chat_id, now).await? else {
            return Ok(Conversation::idle(chat_id, user_id));
        };

        let mut conv = Conversation {
            chat_id,
            user_id: user_id.to_string(),
            pinned: session.pinned_message_id,
            flow: None,
        };
        if session.is_idle() {
            return Ok(conv);
        }
        if session.user_id.as_deref() != Some(user_id) {
            warn!(chat_id, "session belongs to another user, resetting");
            return Ok(conv);
        }
        conv.flow = decode(&session);
        Ok(conv)
    }

    /// Persist the conversation and push its expiry to now + TTL.
    pub async fn save(&self, conv: &Conversation) -> Result<(), SiteError> {
        let now = self.clock.now();
        let (state, context) = match &conv.flow {
            Some(flow) => (flow.state().to_string(), serde_json::to_value(flow)?),
            None => (IDLE_STATE.to_string(), serde_json::json!({})),
        };
        self.store
            .save_session(&Session {
                chat_id: conv.chat_id,
                user_id: Some(conv.user_id.clone()),
                state,
                context,
                pinned_message_id: conv.pinned,
                expires_at: now + self.ttl,
                updated_at: now,
            })
            .await
    }

    /// Drop any active flow. The pinned message survives.
    pub async fn clear(&self, conv: &mut Conversation) -> Result<(), SiteError> {
        conv.flow = None;
        let now = self.clock.now();
        self.store
            .clear_session(conv.chat_id, now, now + self.ttl)
            .await
    }
}

fn decode(session: &Session) -> Option<FlowContext> {
    let tag: FlowState = match session.state.parse() {
        Ok(tag) => tag,
        Err(_) => {
            warn!(chat_id = session.chat_id, state = %session.state, "unknown session state, resetting");
            return None;
        }
    };
    match serde_json::from_value::<FlowContext>(session.context.clone()) {
        Ok(flow) if flow.state() == tag => Some(flow),
        Ok(flow) => {
            warn!(
                chat_id = session.chat_id,
                state = %tag,
                context = %flow.state(),
                "session state and context disagree, resetting"
            );
            None
        }
        Err(e) => {
            warn!(chat_id = session.chat_id, error = %e, "undecodable session context, resetting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::{ReportDraft, ReportStep};
    use sitebot_test_utils::TestHarness;

    fn report_at(step: ReportStep) -> FlowContext {
        FlowContext::Report {
            step,
            draft: ReportDraft {
                project_id: Some("p1".into()),
                ..Default::default()
            },
        }
    }

    async fn manager(h: &TestHarness) -> SessionManager {
        SessionManager::new(h.store(), h.clock.clone(), Duration::hours(8))
    }

    #[tokio::test]
    async fn flow_survives_a_round_trip() {
        let h = TestHarness::builder().build().await.unwrap();
        let sessions = manager(&h).await;

        let mut conv = Conversation::idle(10, "u1");
        conv.pinned = Some(55);
        conv.flow = Some(report_at(ReportStep::Facade));
        sessions.save(&conv).await.unwrap();

        let loaded = sessions.load(10, "u1").await.unwrap();
        assert_eq!(loaded, conv);
    }

    #[tokio::test]
    async fn session_expires_exactly_at_ttl() {
        let h = TestHarness::builder().build().await.unwrap();
        let sessions = manager(&h).await;

        let mut conv = Conversation::idle(10, "u1");
        conv.flow = Some(report_at(ReportStep::Value));
        sessions.save(&conv).await.unwrap();

        h.clock.advance(Duration::hours(8) - Duration::seconds(1));
        assert!(sessions.load(10, "u1").await.unwrap().flow.is_some());

        h.clock.advance(Duration::seconds(1));
        let expired = sessions.load(10, "u1").await.unwrap();
        assert_eq!(expired, Conversation::idle(10, "u1"));
    }

    #[tokio::test]
    async fn clear_keeps_the_pinned_message() {
        let h = TestHarness::builder().build().await.unwrap();
        let sessions = manager(&h).await;

        let mut conv = Conversation::idle(10, "u1");
        conv.pinned = Some(77);
        conv.flow = Some(report_at(ReportStep::Floor));
        sessions.save(&conv).await.unwrap();

        sessions.clear(&mut conv).await.unwrap();
        assert!(conv.flow.is_none());
        let loaded = sessions.load(10, "u1").await.unwrap();
        assert_eq!(loaded.pinned, Some(77));
        assert!(loaded.flow.is_none());
    }

    #[tokio::test]
    async fn mismatched_state_loads_idle() {
        let h = TestHarness::builder().build().await.unwrap();
        let sessions = manager(&h).await;
        let now = h.clock.now();

        let context = serde_json::to_value(report_at(ReportStep::Floor)).unwrap();
        h.store()
            .save_session(&Session {
                chat_id: 10,
                user_id: Some("u1".into()),
                state: "doc:comment".into(),
                context,
                pinned_message_id: Some(3),
                expires_at: now + Duration::hours(1),
                updated_at: now,
            })
            .await
            .unwrap();

        let loaded = sessions.load(10, "u1").await.unwrap();
        assert!(loaded.flow.is_none());
        assert_eq!(loaded.pinned, Some(3));
    }

    #[tokio::test]
    async fn another_users_flow_is_not_resumed() {
        let h = TestHarness::builder().build().await.unwrap();
        let sessions = manager(&h).await;

        let mut conv = Conversation::idle(10, "u1");
        conv.flow = Some(report_at(ReportStep::Facade));
        sessions.save(&conv).await.unwrap();

        assert!(sessions.load(10, "u2").await.unwrap().flow.is_none());
    }
}
