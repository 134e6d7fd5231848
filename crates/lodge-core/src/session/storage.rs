//! Session token storage trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::session::model::Session;

/// Durable local persistence for the session credential.
///
/// The stored copy is what lets a session survive process restart. It holds
/// tokens only; the profile is always re-resolved from the backend.
#[async_trait]
pub trait SessionTokenStorage: Send + Sync {
    /// Loads the persisted session, if any.
    async fn load(&self) -> Result<Option<Session>>;

    /// Persists the session, replacing any previous copy.
    async fn store(&self, session: &Session) -> Result<()>;

    /// Removes the persisted session.
    async fn clear(&self) -> Result<()>;
}
