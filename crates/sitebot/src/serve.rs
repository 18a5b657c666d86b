// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sitebot serve` command implementation.
//!
//! Opens storage, builds the Telegram transport, dispatcher and scheduler,
//! and serves the gateway until SIGINT/SIGTERM. The hourly timer runs in
//! process only when `scheduler.internal_timer` is set.

use std::sync::Arc;

use sitebot_config::SiteConfig;
use sitebot_core::{Clock, SiteError, StorageAdapter, SystemClock};
use sitebot_gateway::{AuthConfig, GatewayState, ServerConfig, start_server};
use sitebot_scheduler::{Scheduler, run_hourly};
use sitebot_storage::SqliteStorage;
use sitebot_telegram::TelegramTransport;
use sitebot_workflow::{Dispatcher, WorkflowSettings};
use tracing::{info, warn};

use crate::shutdown;

/// Open the database and apply pending migrations.
pub async fn open_storage(config: &SiteConfig) -> Result<Arc<SqliteStorage>, SiteError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    Ok(Arc::new(storage))
}

/// Runs the `sitebot serve` command.
pub async fn run_serve(config: SiteConfig) -> Result<(), SiteError> {
    info!(bot = %config.bot.name, "starting sitebot serve");

    let storage = open_storage(&config).await?;
    let store: Arc<dyn StorageAdapter> = storage.clone();
    let transport = Arc::new(TelegramTransport::new(&config.telegram)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let dispatcher = Dispatcher::new(
        store.clone(),
        transport,
        clock.clone(),
        WorkflowSettings::from_config(&config),
    );
    let scheduler = Arc::new(Scheduler::new(
        store.clone(),
        clock,
        config.scheduler.clone(),
    )?);

    let cancel = shutdown::install_signal_handler();

    let timer = if config.scheduler.internal_timer {
        Some(tokio::spawn(run_hourly(scheduler.clone(), cancel.clone())))
    } else {
        info!("internal timer disabled, ticks come from POST /scheduler/tick");
        None
    };

    if config.gateway.scheduler_token.is_none() {
        warn!("gateway.scheduler_token is not set, POST /scheduler/tick will reject every request");
    }
    if config.telegram.webhook_secret.is_none() {
        warn!("telegram.webhook_secret is not set, webhook requests are not authenticated");
    }

    let state = GatewayState {
        dispatcher: Arc::new(dispatcher),
        scheduler,
        store,
        auth: AuthConfig {
            webhook_secret: config.telegram.webhook_secret.clone(),
            scheduler_token: config.gateway.scheduler_token.clone(),
        },
    };
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };

    let served = start_server(&server_config, state, cancel.clone()).await;
    cancel.cancel();

    if let Some(timer) = timer {
        if let Err(e) = timer.await {
            warn!(error = %e, "scheduler timer task ended abnormally");
        }
    }

    storage.close().await?;
    info!("sitebot stopped");
    served
}
