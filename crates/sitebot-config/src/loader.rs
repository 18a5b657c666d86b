// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./sitebot.toml` > `~/.config/sitebot/sitebot.toml` > `/etc/sitebot/sitebot.toml`,
//! with environment variable overrides via the `SITEBOT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::SiteConfig;

/// Config sections that env var names are split on.
const SECTIONS: &[&str] = &["bot", "telegram", "storage", "gateway", "scheduler"];

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/sitebot/sitebot.toml`
/// 3. `~/.config/sitebot/sitebot.toml`
/// 4. `./sitebot.toml`
/// 5. `SITEBOT_*` environment variables
pub fn load_config() -> Result<SiteConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<SiteConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SiteConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SiteConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SiteConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for the standard lookup, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SiteConfig::default()))
        .merge(Toml::file("/etc/sitebot/sitebot.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("sitebot/sitebot.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("sitebot.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `SITEBOT_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Uses `Env::map()` rather than `Env::split("_")`: keys such as
/// `bot_token` contain underscores, so only the first separator after a
/// known section name becomes a dot.
fn env_provider() -> Env {
    Env::prefixed("SITEBOT_").map(|key| map_env_key(key.as_str()).into())
}

/// `GATEWAY_PORT` to `gateway.port`. Figment passes keys in their original case.
fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key
}
