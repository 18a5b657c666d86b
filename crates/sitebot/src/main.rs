// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sitebot - a construction-site operations bot for Telegram.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod serve;
mod shutdown;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use sitebot_config::SiteConfig;
use sitebot_core::types::EventType;

/// Sitebot - a construction-site operations bot for Telegram.
#[derive(Parser, Debug)]
#[command(name = "sitebot", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the Telegram webhook and scheduler endpoints.
    Serve,
    /// Run one scheduler tick and print its report as JSON.
    Tick {
        /// Evaluate as if it were this instant (RFC 3339).
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        /// Run only this rule, e.g. `report.missing`.
        #[arg(long)]
        rule: Option<EventType>,
    },
    /// Apply pending database migrations.
    Migrate,
    /// Print the effective configuration with secrets masked.
    Config,
}

fn load_config(path: Option<&PathBuf>) -> SiteConfig {
    let loaded = match path {
        Some(path) => sitebot_config::load_and_validate_path(path),
        None => sitebot_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            sitebot_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sitebot={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());
    init_tracing(&config.bot.log_level);

    let outcome = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Tick { at, rule }) => commands::run_tick(&config, at, rule)
            .await
            .and_then(|report| {
                serde_json::to_string_pretty(&report)
                    .map(|json| println!("{json}"))
                    .map_err(|e| sitebot_core::SiteError::Internal(e.to_string()))
            }),
        Some(Commands::Migrate) => commands::run_migrate(&config).await,
        Some(Commands::Config) => {
            commands::render_config(&config).map(|rendered| print!("{rendered}"))
        }
        None => {
            println!("sitebot: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = outcome {
        tracing::error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn tick_arguments_parse() {
        let cli = Cli::try_parse_from([
            "sitebot",
            "tick",
            "--at",
            "2026-03-06T14:00:00Z",
            "--rule",
            "report.missing",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Tick { at, rule }) => {
                assert_eq!(at.unwrap().to_rfc3339(), "2026-03-06T14:00:00+00:00");
                assert_eq!(rule, Some(EventType::ReportMissing));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Cli::try_parse_from(["sitebot", "tick", "--rule", "nap.time"]).is_err());
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = sitebot_config::load_and_validate_str("").expect("empty config is valid");
        assert_eq!(config.bot.name, "Sitebot");
    }
}
