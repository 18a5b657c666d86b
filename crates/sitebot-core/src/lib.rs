// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Sitebot operations bot.
//!
//! This crate provides the trait definitions, error type, and domain types
//! used throughout the workspace. The storage backend and chat transport
//! implement traits defined here; the workflow engine and scheduler consume
//! them through trait objects.

pub mod error;
pub mod records;
pub mod traits;
pub mod types;

pub use error::SiteError;
pub use types::{AdapterType, HealthStatus, Role};

pub use traits::{
    ApprovalStore, ChatTransport, Clock, Directory, EventQueue, InboxLedger, PluginAdapter,
    SessionStore, SiteStore, StorageAdapter, SystemClock,
};
