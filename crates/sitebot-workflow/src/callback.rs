// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Callback tokens: `namespace:action[:id[:extra]]`.
//!
//! Tokens travel through the chat platform's 64-byte `callback_data`, so
//! they stay short and ids are never URL-encoded.

/// A parsed callback token borrowing from the raw payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Callback<'a> {
    pub namespace: &'a str,
    pub action: &'a str,
    pub id: Option<&'a str>,
    pub extra: Option<&'a str>,
}

impl<'a> Callback<'a> {
    /// Returns `None` unless both namespace and action are present and non-empty.
    pub fn parse(data: &'a str) -> Option<Self> {
        let mut parts = data.trim().splitn(4, ':');
        let namespace = parts.next().filter(|s| !s.is_empty())?;
        let action = parts.next().filter(|s| !s.is_empty())?;
        let id = parts.next().filter(|s| !s.is_empty());
        let extra = parts.next().filter(|s| !s.is_empty());
        Some(Self {
            namespace,
            action,
            id,
            extra,
        })
    }

    /// `namespace:action`, the routing key.
    pub fn key(&self) -> String {
        format!("{}:{}", self.namespace, self.action)
    }

    pub fn numeric_id(&self) -> Option<i64> {
        self.id.and_then(|id| id.parse().ok())
    }
}

/// Build a token from its parts.
pub fn token(namespace: &str, action: &str, id: Option<&str>) -> String {
    match id {
        Some(id) => format!("{namespace}:{action}:{id}"),
        None => format!("{namespace}:{action}"),
    }
}

pub const HOME: &str = "nav:home";

pub fn flow(action: &str) -> String {
    token("flow", action, None)
}

pub fn flow_value(action: &str, value: &str) -> String {
    token("flow", action, Some(value))
}

pub fn entity(namespace: &str, action: &str, id: i64) -> String {
    token(namespace, action, Some(&id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_parts() {
        let cb = Callback::parse("appr:yes:42:extra:more").unwrap();
        assert_eq!(cb.namespace, "appr");
        assert_eq!(cb.action, "yes");
        assert_eq!(cb.numeric_id(), Some(42));
        assert_eq!(cb.extra, Some("extra:more"));
        assert_eq!(cb.key(), "appr:yes");
    }

    #[test]
    fn short_tokens() {
        let cb = Callback::parse("nav:home").unwrap();
        assert_eq!(cb.id, None);
        assert_eq!(cb.extra, None);
        assert_eq!(Callback::parse("f:notif:daily_digest").unwrap().id, Some("daily_digest"));
    }

    #[test]
    fn rejects_malformed() {
        assert!(Callback::parse("").is_none());
        assert!(Callback::parse("nav").is_none());
        assert!(Callback::parse(":home").is_none());
        assert!(Callback::parse("nav:").is_none());
        assert_eq!(Callback::parse("task:done:x").unwrap().numeric_id(), None);
    }

    #[test]
    fn builders() {
        assert_eq!(flow("confirm"), "flow:confirm");
        assert_eq!(flow_value("pick", "fa"), "flow:pick:fa");
        assert_eq!(entity("inbox", "open", 7), "inbox:open:7");
    }
}
