use serde::{Deserialize, Serialize};

use super::model::Session;

/// Session transitions published by the session store.
///
/// Consumers must distinguish `TokenRefreshed` from `SignedIn`: a silent
/// token rotation with an unchanged subject must not trigger downstream
/// profile re-resolution or remount dependent state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthEvent {
    /// A user signed in, or the restored subject changed.
    SignedIn { session: Session },
    /// The local session was cleared (explicit logout or forced re-auth).
    SignedOut,
    /// The token rotated for the same subject. No identity change.
    TokenRefreshed { session: Session },
    /// An out-of-band password-recovery link was opened.
    PasswordRecovery { session: Session },
}

impl AuthEvent {
    /// Returns true for events that change the authenticated identity and
    /// therefore require profile re-resolution downstream.
    pub fn changes_identity(&self) -> bool {
        matches!(self, Self::SignedIn { .. } | Self::SignedOut)
    }
}
