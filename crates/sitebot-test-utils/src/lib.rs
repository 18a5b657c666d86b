// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Sitebot integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without a live Bot API.
//!
//! # Components
//!
//! - [`MockTransport`] - Chat transport that records every outbound call
//! - [`ManualClock`] - Clock that only moves when told to
//! - [`TestHarness`] - Temp SQLite storage with fixture seeding helpers

pub mod clock;
pub mod harness;
pub mod mock_transport;

pub use clock::ManualClock;
pub use harness::TestHarness;
pub use mock_transport::{MockTransport, Outbound};
