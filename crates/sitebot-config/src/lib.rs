// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Sitebot operations bot.
//!
//! TOML configuration with strict key checking (`deny_unknown_fields`), an
//! XDG-style file hierarchy, `SITEBOT_*` environment overrides, and miette
//! diagnostics with typo suggestions.
//!
//! ```no_run
//! let config = sitebot_config::load_and_validate().expect("config errors");
//! println!("listening on {}:{}", config.gateway.host, config.gateway.port);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::SiteConfig;

/// Load configuration from the standard hierarchy and validate it.
pub fn load_and_validate() -> Result<SiteConfig, Vec<ConfigError>> {
    finish(loader::load_config(), collect_toml_sources)
}

/// Load configuration from an explicit file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<SiteConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        std::fs::read_to_string(path)
            .map(|content| vec![(path.display().to_string(), content)])
            .unwrap_or_default()
    })
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<SiteConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

fn finish(
    loaded: Result<SiteConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<SiteConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

/// Read whichever config files exist so diagnostics can point into them.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut candidates = vec![std::path::PathBuf::from("/etc/sitebot/sitebot.toml")];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("sitebot/sitebot.toml"));
    }
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join("sitebot.toml"));
    }

    candidates
        .into_iter()
        .filter_map(|path| {
            std::fs::read_to_string(&path)
                .ok()
                .map(|content| (path.display().to_string(), content))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_config_with_typo_is_rejected() {
        let errors = load_and_validate_str("[bot]\nnaem = \"x\"\n").unwrap_err();
        assert!(matches!(errors[0], ConfigError::UnknownKey { .. }));
    }

    #[test]
    fn inline_config_with_invalid_value_is_rejected() {
        let errors = load_and_validate_str("[scheduler]\nevening_fact_hour = 30\n").unwrap_err();
        assert!(matches!(errors[0], ConfigError::Validation { .. }));
    }

    #[test]
    fn inline_config_round_trips_through_toml() {
        let config = load_and_validate_str(
            "[telegram]\nbot_token = \"1:x\"\nwebhook_secret = \"s3cret\"\n",
        )
        .unwrap();
        let rendered = toml::to_string(&config).unwrap();
        assert!(rendered.contains("webhook_secret = \"s3cret\""));
    }
}
