// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification scheduler for the Sitebot operations bot.
//!
//! An hourly tick evaluates a fixed catalogue of rules in the operating
//! timezone. Each rule writes at most one queued event per scope and local
//! day; the queue consumer delivers them. The tick can be driven by the
//! gateway endpoint, the `sitebot tick` command or [`run_hourly`].

pub mod report;
pub mod rules;
pub mod scheduler;
pub mod timer;

pub use report::{RuleReport, TickReport};
pub use rules::{Gate, gate};
pub use scheduler::Scheduler;
pub use timer::{run_hourly, until_next_hour};
