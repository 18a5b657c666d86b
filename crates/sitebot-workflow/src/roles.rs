// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Role resolution and menu surfaces.
//!
//! A user may hold several roles but only ever sees the menu of the
//! highest-precedence one, the primary role. Several roles share a menu
//! surface: the three foreman variants all see the foreman menu, the
//! discipline leads all see the design-office menu.

use sitebot_core::Role;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// The highest-precedence role in `roles`, or [`Role::Generic`] when empty.
///
/// Precedence is the declaration order of [`Role`], so the result does not
/// depend on the order of `roles` or on duplicates.
pub fn primary_role(roles: &[Role]) -> Role {
    roles.iter().copied().min().unwrap_or(Role::Generic)
}

/// A role-specific menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Surface {
    Director,
    Pm,
    Project,
    Supply,
    Production,
    Foreman,
    Pto,
    Inspector,
    Generic,
}

impl Surface {
    pub fn of(role: Role) -> Self {
        match role {
            Role::Director => Self::Director,
            Role::Pm => Self::Pm,
            Role::ProjectOpr | Role::ProjectKm | Role::ProjectKmd | Role::Project => Self::Project,
            Role::Supply => Self::Supply,
            Role::Production => Self::Production,
            Role::Foreman1 | Role::Foreman2 | Role::Foreman3 => Self::Foreman,
            Role::Pto => Self::Pto,
            Role::Inspector => Self::Inspector,
            Role::Generic => Self::Generic,
        }
    }

    /// Callback namespace of this surface's menu tokens.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Director => "d",
            Self::Pm => "pm",
            Self::Project => "pr",
            Self::Supply => "s",
            Self::Production => "pd",
            Self::Foreman => "f",
            Self::Pto => "pto",
            Self::Inspector => "i",
            Self::Generic => "g",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::iter().find(|s| s.prefix() == prefix)
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Director => "👔 Director",
            Self::Pm => "📋 Project manager",
            Self::Project => "📐 Design office",
            Self::Supply => "📦 Supply",
            Self::Production => "🏭 Production",
            Self::Foreman => "👷 Foreman",
            Self::Pto => "📑 PTO",
            Self::Inspector => "🔍 Inspector",
            Self::Generic => "👤 Staff",
        }
    }

    /// Menu entries in display order.
    pub fn menu(self) -> &'static [MenuAction] {
        use MenuAction::*;
        match self {
            Self::Director => &[Approvals, Alerts, Inbox, Projects, Tasks, Settings],
            Self::Pm => &[
                Inbox, Approvals, Alerts, NewAlert, Send, Log, Tasks, Projects, Settings,
            ],
            Self::Project | Self::Production | Self::Pto => {
                &[Inbox, Send, Tasks, Projects, Settings]
            }
            Self::Supply => &[Inbox, Send, NewAlert, Tasks, Projects, Settings],
            Self::Foreman => &[
                Report, Photo, Log, NewAlert, Send, Inbox, Tasks, Projects, Settings,
            ],
            Self::Inspector => &[
                Accept, History, Inbox, Send, Alerts, NewAlert, Photo, Tasks, Projects, Settings,
            ],
            Self::Generic => &[Inbox, Tasks, Projects, Settings],
        }
    }

    /// Whether `action` may be invoked from this surface.
    pub fn offers(self, action: MenuAction) -> bool {
        matches!(action, MenuAction::Menu | MenuAction::Notif) || self.menu().contains(&action)
    }

    /// Roles whose inbox items this surface reads.
    pub fn inbox_roles(self, primary: Role) -> Vec<Role> {
        match self {
            Self::Foreman => vec![Role::Foreman1, Role::Foreman2, Role::Foreman3],
            Self::Project => vec![
                Role::ProjectOpr,
                Role::ProjectKm,
                Role::ProjectKmd,
                Role::Project,
            ],
            _ => vec![primary],
        }
    }
}

/// Actions reachable from a role menu as `<prefix>:<action>[:<arg>]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum MenuAction {
    Menu,
    Inbox,
    Approvals,
    Alerts,
    Tasks,
    Projects,
    Settings,
    /// Toggle a notification preference named by the argument.
    Notif,
    Send,
    Report,
    Photo,
    Log,
    #[strum(to_string = "alert")]
    NewAlert,
    /// Stages awaiting the inspector.
    Accept,
    /// Stages the inspector already decided.
    History,
}

impl MenuAction {
    pub fn label(self) -> &'static str {
        match self {
            Self::Menu => "◀️ Menu",
            Self::Inbox => "📥 Inbox",
            Self::Approvals => "✍️ Approvals",
            Self::Alerts => "🚨 Alerts",
            Self::Tasks => "✔️ My tasks",
            Self::Projects => "🏗 Projects",
            Self::Settings => "⚙️ Settings",
            Self::Notif => "🔔 Notifications",
            Self::Send => "📤 Send document",
            Self::Report => "📊 Progress report",
            Self::Photo => "📷 Photo report",
            Self::Log => "📝 Daily log",
            Self::NewAlert => "⚠️ Raise alert",
            Self::Accept => "✅ Stage acceptance",
            Self::History => "📊 Inspection history",
        }
    }

    /// Callback token for this action on `surface`.
    pub fn token(self, surface: Surface) -> String {
        format!("{}:{}", surface.prefix(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::iter().collect::<Vec<_>>())
    }

    proptest! {
        #[test]
        fn primary_role_ignores_order(mut roles in prop::collection::vec(any_role(), 0..8), seed in any::<u64>()) {
            let expected = primary_role(&roles);
            // Deterministic shuffle driven by the seed.
            let len = roles.len();
            if len > 1 {
                let mut state = seed;
                for i in (1..len).rev() {
                    state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    let j = (state >> 33) as usize % (i + 1);
                    roles.swap(i, j);
                }
            }
            prop_assert_eq!(primary_role(&roles), expected);
        }

        #[test]
        fn primary_role_ignores_duplicates(roles in prop::collection::vec(any_role(), 1..6)) {
            let mut doubled = roles.clone();
            doubled.extend(roles.iter().copied());
            prop_assert_eq!(primary_role(&doubled), primary_role(&roles));
        }

        #[test]
        fn primary_role_is_a_member(roles in prop::collection::vec(any_role(), 1..6)) {
            let primary = primary_role(&roles);
            prop_assert!(roles.contains(&primary));
            prop_assert!(roles.iter().all(|r| primary <= *r));
        }
    }

    #[test]
    fn precedence_examples() {
        assert_eq!(primary_role(&[]), Role::Generic);
        assert_eq!(primary_role(&[Role::Foreman2, Role::Pm]), Role::Pm);
        assert_eq!(primary_role(&[Role::Inspector, Role::Pto]), Role::Pto);
        assert_eq!(primary_role(&[Role::Foreman3, Role::Foreman1]), Role::Foreman1);
        assert_eq!(
            primary_role(&[Role::Supply, Role::ProjectKmd, Role::Director]),
            Role::Director
        );
    }

    #[test]
    fn surfaces_group_role_variants() {
        assert_eq!(Surface::of(Role::Foreman1).prefix(), "f");
        assert_eq!(Surface::of(Role::Foreman3), Surface::of(Role::Foreman1));
        assert_eq!(Surface::of(Role::ProjectKmd), Surface::of(Role::Project));
        assert_eq!(Surface::of(Role::Director).prefix(), "d");
        assert_eq!(Surface::of(Role::Generic).prefix(), "g");
        for role in Role::iter() {
            let surface = Surface::of(role);
            assert_eq!(Surface::from_prefix(surface.prefix()), Some(surface));
        }
        assert_eq!(Surface::from_prefix("nav"), None);
    }

    #[test]
    fn menu_tokens_parse_back() {
        for surface in Surface::iter() {
            for action in surface.menu() {
                let token = action.token(surface);
                let (prefix, name) = token.split_once(':').unwrap();
                assert_eq!(Surface::from_prefix(prefix), Some(surface));
                assert_eq!(name.parse::<MenuAction>().unwrap(), *action);
            }
        }
        assert_eq!(MenuAction::NewAlert.token(Surface::Foreman), "f:alert");
    }

    #[test]
    fn foremen_share_an_inbox() {
        let roles = Surface::of(Role::Foreman2).inbox_roles(Role::Foreman2);
        assert!(roles.contains(&Role::Foreman1));
        assert!(roles.contains(&Role::Foreman3));
        assert_eq!(Surface::Pm.inbox_roles(Role::Pm), vec![Role::Pm]);
    }

    #[test]
    fn every_sender_has_document_types() {
        use sitebot_core::records::document_catalogue;
        for role in Role::iter() {
            let offers_send = Surface::of(role).offers(MenuAction::Send);
            assert_eq!(
                offers_send,
                !document_catalogue(role).is_empty(),
                "send menu and catalogue disagree for {role}"
            );
        }
    }

    #[test]
    fn only_the_inspector_accepts_stages() {
        for surface in Surface::iter() {
            let expected = surface == Surface::Inspector;
            assert_eq!(surface.offers(MenuAction::Accept), expected);
            assert_eq!(surface.offers(MenuAction::History), expected);
        }
        assert_eq!(MenuAction::Accept.token(Surface::Inspector), "i:accept");
    }

    #[test]
    fn only_field_roles_file_reports() {
        assert!(Surface::Foreman.offers(MenuAction::Report));
        assert!(!Surface::Director.offers(MenuAction::Report));
        assert!(Surface::Generic.offers(MenuAction::Menu));
        assert!(Surface::Generic.offers(MenuAction::Notif));
    }
}
