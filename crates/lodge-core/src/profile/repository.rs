//! Profile repository trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::profile::model::{NewProfile, Profile};

/// Backend persistence for profiles.
///
/// Deletion is deliberately absent: removing a profile is an external admin
/// operation, never performed by this layer.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fetches a profile by id. `Ok(None)` means the record does not exist
    /// (expected on first login); transport failures are errors.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>>;

    /// Creates a profile. A conflict (concurrent creation for the same id)
    /// surfaces as an error; callers recover by re-fetching.
    async fn create(&self, profile: &NewProfile) -> Result<Profile>;

    /// Saves profile edits. Last write wins.
    async fn update(&self, profile: &Profile) -> Result<Profile>;
}
