//! The guarded view-state waterfall.
//!
//! A small ordered sequence of guard states precedes the main shell. Guards
//! are not a queue: the whole table is re-evaluated from the top on every
//! state change, and the first guard whose condition holds wins. Keeping
//! the table explicit makes the precedence order auditable and lets it be
//! tested as a pure function from (session, profile, flags) to a phase tag.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::profile::{AccessMode, Role};

/// The screen class the shell must render right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum AppPhase {
    /// Session/profile bootstrap in flight: blocking loading indicator.
    AuthBootstrapping,
    /// An out-of-band recovery link was opened: password-reset form.
    PasswordRecovery,
    /// No session: login form.
    Unauthenticated,
    /// Elevated role, no access mode chosen yet: role-selection prompt.
    RoleSelection,
    /// Session exists but the profile is not resolved yet: minimal loading
    /// state, distinct from `AuthBootstrapping` to cover edge timing.
    ProfilePending,
    /// Operating in admin mode: the separate admin shell.
    AdminShell,
    /// First-run wizard for members who have not completed onboarding.
    Onboarding,
    /// Terminal: the full application shell driven by the current view.
    Main,
}

/// Pure inputs to the guard table, assembled by the controller from the
/// session store, the profile resolver and its own flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShellSnapshot {
    /// Session bootstrap or initial profile resolution still in flight.
    pub bootstrapping: bool,
    /// A password-recovery link was opened and not yet completed.
    pub recovery_pending: bool,
    /// A session is present.
    pub authenticated: bool,
    /// Role of the resolved profile; `None` while unresolved.
    pub role: Option<Role>,
    /// Access mode chosen this run, if any.
    pub access_mode: Option<AccessMode>,
    /// Profile's onboarding-completion flag.
    pub onboarding_complete: bool,
    /// Local show-onboarding flag (defaults true, cleared when the wizard
    /// finishes).
    pub show_onboarding: bool,
}

impl ShellSnapshot {
    fn role_is_elevated(&self) -> bool {
        self.role.map(|role| role.is_elevated()).unwrap_or(false)
    }

    /// An admin access mode is only honored while the resolved role is
    /// elevated. A stale flag held by a plain member is ignored here and
    /// cleared by the controller when observed.
    pub fn admin_mode_active(&self) -> bool {
        self.access_mode == Some(AccessMode::Admin) && self.role_is_elevated()
    }
}

type Predicate = fn(&ShellSnapshot) -> bool;

fn bootstrapping(s: &ShellSnapshot) -> bool {
    s.bootstrapping
}

fn recovery_pending(s: &ShellSnapshot) -> bool {
    s.recovery_pending
}

fn unauthenticated(s: &ShellSnapshot) -> bool {
    !s.authenticated
}

fn role_ambiguous(s: &ShellSnapshot) -> bool {
    s.role_is_elevated() && s.access_mode.is_none()
}

fn profile_pending(s: &ShellSnapshot) -> bool {
    s.role.is_none()
}

fn admin_redirect(s: &ShellSnapshot) -> bool {
    s.admin_mode_active()
}

fn onboarding_due(s: &ShellSnapshot) -> bool {
    !s.onboarding_complete && s.show_onboarding
}

fn always(_: &ShellSnapshot) -> bool {
    true
}

/// The guard table, in priority order. `Main` is the terminal fallback.
const GUARDS: &[(Predicate, AppPhase)] = &[
    (bootstrapping, AppPhase::AuthBootstrapping),
    (recovery_pending, AppPhase::PasswordRecovery),
    (unauthenticated, AppPhase::Unauthenticated),
    (role_ambiguous, AppPhase::RoleSelection),
    (profile_pending, AppPhase::ProfilePending),
    (admin_redirect, AppPhase::AdminShell),
    (onboarding_due, AppPhase::Onboarding),
    (always, AppPhase::Main),
];

/// Evaluates the guard table top to bottom and returns the first phase
/// whose predicate holds.
pub fn resolve_phase(snapshot: &ShellSnapshot) -> AppPhase {
    for (predicate, phase) in GUARDS {
        if predicate(snapshot) {
            return *phase;
        }
    }
    // The table ends in an unconditional entry.
    AppPhase::Main
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    fn member_in_main() -> ShellSnapshot {
        ShellSnapshot {
            bootstrapping: false,
            recovery_pending: false,
            authenticated: true,
            role: Some(Role::Member),
            access_mode: None,
            onboarding_complete: true,
            show_onboarding: true,
        }
    }

    #[test]
    fn test_bootstrapping_wins_over_everything() {
        let snapshot = ShellSnapshot {
            bootstrapping: true,
            recovery_pending: true,
            ..Default::default()
        };
        assert_eq!(resolve_phase(&snapshot), AppPhase::AuthBootstrapping);
    }

    #[test]
    fn test_recovery_precedes_login() {
        let snapshot = ShellSnapshot {
            recovery_pending: true,
            authenticated: false,
            ..Default::default()
        };
        assert_eq!(resolve_phase(&snapshot), AppPhase::PasswordRecovery);
    }

    #[test]
    fn test_no_session_shows_login() {
        let snapshot = ShellSnapshot {
            authenticated: false,
            ..Default::default()
        };
        assert_eq!(resolve_phase(&snapshot), AppPhase::Unauthenticated);
    }

    #[test]
    fn test_role_selection_iff_elevated_and_unchosen() {
        for role in Role::iter() {
            let snapshot = ShellSnapshot {
                authenticated: true,
                role: Some(role),
                access_mode: None,
                onboarding_complete: true,
                ..Default::default()
            };
            let expect_selection = role.is_elevated();
            assert_eq!(
                resolve_phase(&snapshot) == AppPhase::RoleSelection,
                expect_selection,
                "role {} should{} prompt for selection",
                role,
                if expect_selection { "" } else { " not" }
            );

            // Once a mode is recorded the prompt never reappears.
            let chosen = ShellSnapshot {
                access_mode: Some(AccessMode::Member),
                ..snapshot
            };
            assert_ne!(resolve_phase(&chosen), AppPhase::RoleSelection);
        }
    }

    #[test]
    fn test_profile_pending_when_session_without_profile() {
        let snapshot = ShellSnapshot {
            authenticated: true,
            role: None,
            ..Default::default()
        };
        assert_eq!(resolve_phase(&snapshot), AppPhase::ProfilePending);
    }

    #[test]
    fn test_admin_mode_renders_admin_shell() {
        let snapshot = ShellSnapshot {
            authenticated: true,
            role: Some(Role::Admin),
            access_mode: Some(AccessMode::Admin),
            onboarding_complete: false,
            show_onboarding: true,
            ..Default::default()
        };
        // Admin shell precedes onboarding.
        assert_eq!(resolve_phase(&snapshot), AppPhase::AdminShell);
    }

    #[test]
    fn test_stale_admin_flag_never_reaches_admin_shell_for_member() {
        let snapshot = ShellSnapshot {
            authenticated: true,
            role: Some(Role::Member),
            access_mode: Some(AccessMode::Admin),
            onboarding_complete: true,
            ..Default::default()
        };
        assert_eq!(resolve_phase(&snapshot), AppPhase::Main);
    }

    #[test]
    fn test_onboarding_for_incomplete_member() {
        let snapshot = ShellSnapshot {
            onboarding_complete: false,
            show_onboarding: true,
            ..member_in_main()
        };
        assert_eq!(resolve_phase(&snapshot), AppPhase::Onboarding);

        // Dismissing the local flag skips the wizard even while the profile
        // flag is still false.
        let dismissed = ShellSnapshot {
            show_onboarding: false,
            ..snapshot
        };
        assert_eq!(resolve_phase(&dismissed), AppPhase::Main);
    }

    #[test]
    fn test_member_reaches_main() {
        assert_eq!(resolve_phase(&member_in_main()), AppPhase::Main);
    }

    #[test]
    fn test_elevated_user_continuing_as_member_reaches_main() {
        let snapshot = ShellSnapshot {
            role: Some(Role::Staff),
            access_mode: Some(AccessMode::Member),
            ..member_in_main()
        };
        assert_eq!(resolve_phase(&snapshot), AppPhase::Main);
    }
}
