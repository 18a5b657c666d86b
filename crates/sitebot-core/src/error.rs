// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Sitebot workspace.

use thiserror::Error;

/// The primary error type used across all Sitebot adapter traits and core operations.
#[derive(Debug, Error)]
pub enum SiteError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Chat transport errors (Bot API failure, malformed response, rate limiting).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// User input failed a step's validation rule.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The chat is not bound to a known user.
    #[error("chat is not linked to a user account")]
    Unauthenticated,

    /// The caller is not allowed to perform the requested action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SiteError {
    /// Shorthand for a [`SiteError::NotFound`] with a displayable id.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns `true` for errors caused by the user rather than the system.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Validation(_) | Self::Unauthenticated | Self::Forbidden(_)
        )
    }
}

impl From<serde_json::Error> for SiteError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage {
            source: Box::new(e),
        }
    }
}
