// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod clock;
pub mod storage;
pub mod transport;

pub use adapter::PluginAdapter;
pub use clock::{Clock, SystemClock};
pub use storage::{
    ApprovalStore, Directory, EventQueue, InboxLedger, SessionStore, SiteStore, StorageAdapter,
};
pub use transport::ChatTransport;
