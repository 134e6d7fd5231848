//! The closed set of named screens inside the main application shell.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// One of the fixed screens the main shell can show.
///
/// Exactly one view is current at any time. Views are mutated only by the
/// navigation resolver or explicit user action; there is no browser-history
/// integration. The symbolic form is SCREAMING_SNAKE_CASE
/// (`"ADMIN_MEMBERS"`), which is also what the navigation resolver matches
/// path segments against.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum View {
    Dashboard,
    Agenda,
    Members,
    Messages,
    Notifications,
    Profile,
    Academy,
    Business,
    Deals,
    Rankings,
    Referrals,
    Settings,
    AdminDashboard,
    AdminMembers,
    AdminEvents,
    AdminContent,
}

impl Default for View {
    fn default() -> Self {
        View::Dashboard
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_symbolic_form_is_screaming_snake_case() {
        assert_eq!(View::AdminMembers.to_string(), "ADMIN_MEMBERS");
        assert_eq!(View::Deals.to_string(), "DEALS");
    }

    #[test]
    fn test_every_view_parses_from_its_symbolic_form() {
        for view in View::iter() {
            let parsed: View = view.to_string().parse().unwrap();
            assert_eq!(parsed, view);
        }
    }

    #[test]
    fn test_unknown_symbol_does_not_parse() {
        assert!("NOT_A_VIEW".parse::<View>().is_err());
    }
}
