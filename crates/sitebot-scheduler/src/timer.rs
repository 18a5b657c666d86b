// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process hourly trigger, used when no external cron calls the tick endpoint.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::scheduler::Scheduler;

/// Time left until the next full hour. Offsets are whole hours, so this is
/// also the next local full hour.
pub fn until_next_hour(now: DateTime<Utc>) -> Duration {
    let into_hour = u64::from(now.minute()) * 60 + u64::from(now.second());
    Duration::from_secs(3600 - into_hour)
}

/// Run a tick at every full hour until `cancel` fires.
pub async fn run_hourly(scheduler: Arc<Scheduler>, cancel: CancellationToken) {
    info!("scheduler timer started");
    loop {
        let wait = until_next_hour(scheduler.now());
        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                let report = scheduler.tick().await;
                if report.has_errors() {
                    warn!(local_time = %report.local_time, "tick finished with rule errors");
                }
            }
            _ = cancel.cancelled() => {
                info!("scheduler timer shutting down");
                break;
            }
        }
    }
}
