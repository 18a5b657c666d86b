// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversational workflow for the Sitebot operations bot.
//!
//! The [`Dispatcher`] turns one inbound [`ChatEvent`] into storage writes and
//! a rendered screen:
//!
//! - the caller is resolved to an identity and a primary role ([`roles`]),
//! - the chat's conversation is loaded from the session store ([`session`]),
//! - text and callbacks are routed through a declarative table ([`router`]),
//! - guided multi-step flows collect a draft and commit it in one write
//!   ([`flows`]),
//! - every screen is rendered onto one pinned message per chat ([`render`]).
//!
//! [`ChatEvent`]: sitebot_core::types::ChatEvent

pub(crate) mod actions;
pub mod callback;
pub mod dispatcher;
pub mod flows;
pub mod render;
pub mod roles;
pub mod router;
pub mod screens;
pub mod session;
pub mod settings;

pub use dispatcher::Dispatcher;
pub use render::{Renderer, Screen};
pub use roles::{MenuAction, Surface, primary_role};
pub use session::{Conversation, SessionManager};
pub use settings::WorkflowSettings;
