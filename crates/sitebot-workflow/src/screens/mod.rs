// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure screen builders. Nothing here touches storage or the transport.

pub mod alerts;
pub mod approvals;
pub mod common;
pub mod inbox;
pub mod menu;
pub mod projects;
pub mod settings;
pub mod stages;
pub mod tasks;
