// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for Sitebot.
//!
//! Receives Telegram webhook updates and hands them to the dispatcher,
//! exposes the scheduler tick for an external cron, and answers health checks.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use server::{GatewayState, ServerConfig, router, start_server};
