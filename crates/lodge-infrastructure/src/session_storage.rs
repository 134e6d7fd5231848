//! File-backed session persistence.
//!
//! Persists the session credential to `session.toml` under the Lodge
//! config directory so it survives process restart. The stored document is
//! versioned so a future layout change can migrate or discard old copies
//! instead of failing to parse.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lodge_core::session::{IdentityClaims, Session, SessionTokenStorage};
use lodge_core::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::paths::LodgePaths;
use crate::storage::AtomicTomlFile;

/// Current stored-session document version.
const STORED_SESSION_VERSION: u32 = 1;

/// On-disk representation of a persisted session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub version: u32,
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub claims: StoredClaims,
}

/// Identity hints persisted with the session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

impl From<&Session> for StoredSession {
    fn from(session: &Session) -> Self {
        Self {
            version: STORED_SESSION_VERSION,
            user_id: session.user_id,
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            expires_at: session.expires_at,
            claims: StoredClaims {
                email: session.claims.email.clone(),
                full_name: session.claims.full_name.clone(),
                avatar_url: session.claims.avatar_url.clone(),
                organization: session.claims.organization.clone(),
            },
        }
    }
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        Session {
            user_id: stored.user_id,
            access_token: stored.access_token,
            refresh_token: stored.refresh_token,
            expires_at: stored.expires_at,
            claims: IdentityClaims {
                email: stored.claims.email,
                full_name: stored.claims.full_name,
                avatar_url: stored.claims.avatar_url,
                organization: stored.claims.organization,
            },
        }
    }
}

/// `SessionTokenStorage` implementation over an atomic TOML file.
pub struct FileSessionStorage {
    file: AtomicTomlFile<StoredSession>,
}

impl FileSessionStorage {
    /// Creates a storage rooted at the default platform location
    /// (`~/.config/lodge/session.toml`).
    pub fn new() -> Result<Self> {
        let path = LodgePaths::session_file()
            .map_err(|err| lodge_core::LodgeError::config(err.to_string()))?;
        Ok(Self::with_path(path))
    }

    /// Creates a storage at an explicit path. Used by tests and embedders
    /// that manage their own directories.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
        }
    }
}

#[async_trait]
impl SessionTokenStorage for FileSessionStorage {
    async fn load(&self) -> Result<Option<Session>> {
        match self.file.load() {
            Ok(stored) => Ok(stored.map(Session::from)),
            Err(err) => {
                // A corrupt or unreadable file must not block startup; the
                // user simply signs in again.
                tracing::warn!("[SessionStorage] Discarding unreadable session file: {}", err);
                Ok(None)
            }
        }
    }

    async fn store(&self, session: &Session) -> Result<()> {
        self.file.save(&StoredSession::from(session))
    }

    async fn clear(&self) -> Result<()> {
        self.file.remove()
    }
}
