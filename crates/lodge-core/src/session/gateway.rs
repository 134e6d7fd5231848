//! Authentication gateway trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::session::model::{Credentials, Session};

/// Remote authentication operations consumed by the session store.
///
/// Implementations talk to the hosted auth service; the session store owns
/// all local state and event fan-out. Errors from `sign_in` carry the
/// backend's user-facing message verbatim and are never retried silently.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Exchanges credentials for a session.
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session>;

    /// Best-effort remote sign-out. Callers clear local state regardless of
    /// the outcome.
    async fn sign_out(&self, access_token: &str) -> Result<()>;

    /// Exchanges a refresh token for a fresh session. Also serves as
    /// re-validation: a revoked token surfaces as an auth error here.
    async fn refresh(&self, refresh_token: &str) -> Result<Session>;

    /// Sets a new password for the authenticated user.
    async fn update_password(&self, access_token: &str, new_password: &str) -> Result<()>;

    /// Sends a password-recovery email.
    async fn request_password_recovery(&self, email: &str) -> Result<()>;
}
