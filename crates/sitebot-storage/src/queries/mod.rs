// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules, one per storage concern.

pub mod alerts;
pub mod approvals;
pub mod audit;
pub mod directory;
pub mod events;
pub mod inbox;
pub mod projects;
pub mod sessions;
pub mod stages;
pub mod submissions;
pub mod supply;
pub mod tasks;
