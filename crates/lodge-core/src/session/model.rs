//! Session domain model.
//!
//! A `Session` is the opaque credential bundle identifying the current user
//! to the backend. It is owned exclusively by the session store, persisted
//! to durable local storage so it survives process restart, and destroyed
//! on logout or expiry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Margin applied when checking token expiry, so a token that is about to
/// lapse is refreshed before the backend starts rejecting it.
const EXPIRY_SKEW_SECONDS: i64 = 30;

/// The authenticated credential bundle for the current user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Subject identifier. The resolved profile id must equal this value.
    pub user_id: Uuid,
    /// Bearer token sent with every backend call.
    pub access_token: String,
    /// Token used to obtain a fresh access token.
    pub refresh_token: String,
    /// Access token expiry.
    pub expires_at: DateTime<Utc>,
    /// Identity hints carried by the credential, used for lazy profile
    /// creation on first login.
    #[serde(default)]
    pub claims: IdentityClaims,
}

impl Session {
    /// Returns true when the access token has expired or is about to.
    pub fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_SKEW_SECONDS) >= self.expires_at
    }
}

/// Optional identity hints attached to a session.
///
/// These come from the identity provider, not from the profile table, and
/// are only trusted as seed values when creating a profile that does not
/// exist yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

impl IdentityClaims {
    /// Best display name available from the claims: the full name, then the
    /// local part of the email address, then a neutral placeholder.
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.full_name {
            if !name.trim().is_empty() {
                return name.trim().to_string();
            }
        }
        if let Some(email) = &self.email {
            if let Some(local) = email.split('@').next() {
                if !local.is_empty() {
                    return local.to_string();
                }
            }
        }
        "Member".to_string()
    }
}

/// Email/password credentials submitted by the login form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}
