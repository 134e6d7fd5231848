//! The profile resolver: turns a valid session into a profile, creating
//! one on first login.
//!
//! Resolution is serialized by an async mutex so concurrent triggers
//! collapse into one backend request, and the fetch races a bounded
//! timeout. Because the losing future is dropped and every cache write
//! happens under the same lock, a late fetch result can never clobber a
//! state that has already moved on.

use std::sync::Arc;
use std::time::Duration;

use lodge_core::profile::{NewProfile, Profile, ProfileRepository};
use lodge_core::session::Session;
use lodge_core::{LodgeError, Result};
use tokio::sync::{Mutex, RwLock};

/// Default ceiling on a single profile fetch.
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Outcome of a resolution attempt.
///
/// `ClearSession` is the conservative recovery for an unverifiable
/// identity: rather than synthesizing a profile from unverified claims and
/// risking the wrong role, the caller drops the session and returns to the
/// login guard.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(Profile),
    ClearSession,
}

/// Resolves and caches the current user's profile.
pub struct ProfileResolver {
    repository: Arc<dyn ProfileRepository>,
    cache: RwLock<Option<Profile>>,
    /// Serializes resolution; the guard makes creation idempotent.
    in_flight: Mutex<()>,
    fetch_timeout: Duration,
}

impl ProfileResolver {
    pub fn new(repository: Arc<dyn ProfileRepository>) -> Self {
        Self::with_timeout(repository, DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(repository: Arc<dyn ProfileRepository>, fetch_timeout: Duration) -> Self {
        Self {
            repository,
            cache: RwLock::new(None),
            in_flight: Mutex::new(()),
            fetch_timeout,
        }
    }

    /// The cached profile, if one was resolved this session.
    pub async fn current(&self) -> Option<Profile> {
        self.cache.read().await.clone()
    }

    /// Drops the cache. Called on sign-out.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    /// Resolves the profile for a session, creating it on first login.
    ///
    /// Concurrent calls for the same subject collapse: the second caller
    /// waits on the in-flight guard and then observes the cache, so at
    /// most one creation request ever reaches the backend.
    pub async fn resolve(&self, session: &Session) -> Result<Resolution> {
        let _guard = self.in_flight.lock().await;

        if let Some(cached) = self.cached_for(session).await {
            return Ok(Resolution::Resolved(cached));
        }

        match tokio::time::timeout(
            self.fetch_timeout,
            self.repository.find_by_id(session.user_id),
        )
        .await
        {
            Ok(Ok(Some(profile))) => self.accept(session, profile).await.map(Resolution::Resolved),
            Ok(Ok(None)) => self.create_from_claims(session).await,
            Ok(Err(err)) if err.is_not_found() => self.create_from_claims(session).await,
            Ok(Err(err)) => {
                tracing::warn!(
                    "[ProfileResolver] Fetch failed for {}: {}",
                    session.user_id,
                    err
                );
                Ok(Resolution::ClearSession)
            }
            Err(_) => {
                tracing::warn!(
                    "[ProfileResolver] Fetch timed out after {:?} for {}",
                    self.fetch_timeout,
                    session.user_id
                );
                Ok(Resolution::ClearSession)
            }
        }
    }

    /// Forced re-fetch (used after onboarding and profile edits elsewhere).
    ///
    /// A transient failure keeps the cached copy — never flash an empty
    /// state over a network blip.
    pub async fn refresh(&self, session: &Session) -> Result<Resolution> {
        let _guard = self.in_flight.lock().await;

        let fetched = match tokio::time::timeout(
            self.fetch_timeout,
            self.repository.find_by_id(session.user_id),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(LodgeError::timeout("profile refresh")),
        };

        match fetched {
            Ok(Some(profile)) => self.accept(session, profile).await.map(Resolution::Resolved),
            Ok(None) => {
                // The row vanished underneath us; an external admin delete.
                tracing::warn!("[ProfileResolver] Profile {} no longer exists", session.user_id);
                Ok(Resolution::ClearSession)
            }
            Err(err) => match self.cached_for(session).await {
                Some(cached) => {
                    tracing::warn!(
                        "[ProfileResolver] Refresh failed for {} ({}), keeping cached copy",
                        session.user_id,
                        err
                    );
                    Ok(Resolution::Resolved(cached))
                }
                None => {
                    tracing::warn!(
                        "[ProfileResolver] Refresh failed for {} with no cached copy: {}",
                        session.user_id,
                        err
                    );
                    Ok(Resolution::ClearSession)
                }
            },
        }
    }

    /// Saves profile edits through the repository and caches the stored
    /// row. Last write wins.
    pub async fn save(&self, profile: &Profile) -> Result<Profile> {
        let stored = self.repository.update(profile).await?;
        *self.cache.write().await = Some(stored.clone());
        Ok(stored)
    }

    async fn cached_for(&self, session: &Session) -> Option<Profile> {
        self.cache
            .read()
            .await
            .clone()
            .filter(|profile| profile.id == session.user_id)
    }

    /// Validates the identity invariant and caches the profile.
    async fn accept(&self, session: &Session, profile: Profile) -> Result<Profile> {
        if profile.id != session.user_id {
            // A corrupted lookup; proceeding would impersonate another
            // member. Fatal to the session.
            return Err(LodgeError::identity_mismatch(
                session.user_id.to_string(),
                profile.id.to_string(),
            ));
        }
        *self.cache.write().await = Some(profile.clone());
        Ok(profile)
    }

    /// First-login path: create the profile from identity claims.
    async fn create_from_claims(&self, session: &Session) -> Result<Resolution> {
        let new_profile = NewProfile::from_claims(session.user_id, &session.claims);
        tracing::info!("[ProfileResolver] Creating profile for {}", session.user_id);

        match self.repository.create(&new_profile).await {
            Ok(profile) => self.accept(session, profile).await.map(Resolution::Resolved),
            Err(create_err) => {
                // Most likely a lost creation race; the winner's row is the
                // truth, so try one re-fetch before giving up.
                tracing::warn!(
                    "[ProfileResolver] Creation failed for {} ({}), re-fetching",
                    session.user_id,
                    create_err
                );
                match self.repository.find_by_id(session.user_id).await {
                    Ok(Some(profile)) => {
                        self.accept(session, profile).await.map(Resolution::Resolved)
                    }
                    Ok(None) | Err(_) => Ok(Resolution::ClearSession),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use lodge_core::profile::Role;
    use lodge_core::session::IdentityClaims;
    use uuid::Uuid;

    use super::*;

    fn session_for(user_id: Uuid) -> Session {
        Session {
            user_id,
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
            claims: IdentityClaims {
                full_name: Some("New Member".to_string()),
                ..Default::default()
            },
        }
    }

    fn profile_for(id: Uuid) -> Profile {
        Profile {
            id,
            display_name: "New Member".to_string(),
            role: Role::Member,
            organization: None,
            title: None,
            avatar_url: None,
            bio: None,
            social_links: Default::default(),
            tags: Vec::new(),
            onboarding_complete: false,
            company: None,
            referral_count: 0,
            ranking_points: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Repository with scripted state and call counters.
    #[derive(Default)]
    struct MockRepository {
        profile: StdMutex<Option<Profile>>,
        find_calls: AtomicUsize,
        create_calls: AtomicUsize,
        find_hangs: AtomicBool,
        find_fails: AtomicBool,
        create_fails: AtomicBool,
    }

    #[async_trait]
    impl ProfileRepository for MockRepository {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>> {
            self.find_calls.fetch_add(1, Ordering::SeqCst);
            if self.find_hangs.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.find_fails.load(Ordering::SeqCst) {
                return Err(LodgeError::network("profiles unreachable"));
            }
            Ok(self
                .profile
                .lock()
                .unwrap()
                .clone()
                .filter(|profile| profile.id == id))
        }

        async fn create(&self, new_profile: &NewProfile) -> Result<Profile> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if self.create_fails.load(Ordering::SeqCst) {
                return Err(LodgeError::internal("duplicate key"));
            }
            let profile = Profile {
                display_name: new_profile.display_name.clone(),
                ..profile_for(new_profile.id)
            };
            *self.profile.lock().unwrap() = Some(profile.clone());
            Ok(profile)
        }

        async fn update(&self, profile: &Profile) -> Result<Profile> {
            *self.profile.lock().unwrap() = Some(profile.clone());
            Ok(profile.clone())
        }
    }

    fn resolver_with(repository: Arc<MockRepository>) -> ProfileResolver {
        ProfileResolver::with_timeout(repository, Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_existing_profile_resolves() {
        let user_id = Uuid::new_v4();
        let repository = Arc::new(MockRepository::default());
        *repository.profile.lock().unwrap() = Some(profile_for(user_id));

        let resolver = resolver_with(repository.clone());
        let resolution = resolver.resolve(&session_for(user_id)).await.unwrap();

        assert!(matches!(resolution, Resolution::Resolved(_)));
        assert_eq!(repository.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_first_login_creates_profile_from_claims() {
        let user_id = Uuid::new_v4();
        let repository = Arc::new(MockRepository::default());

        let resolver = resolver_with(repository.clone());
        let resolution = resolver.resolve(&session_for(user_id)).await.unwrap();

        match resolution {
            Resolution::Resolved(profile) => {
                assert_eq!(profile.id, user_id);
                assert_eq!(profile.display_name, "New Member");
                assert_eq!(profile.role, Role::Member);
                assert!(!profile.onboarding_complete);
            }
            Resolution::ClearSession => panic!("expected a created profile"),
        }
        assert_eq!(repository.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_resolution_creates_at_most_once() {
        let user_id = Uuid::new_v4();
        let repository = Arc::new(MockRepository::default());
        let resolver = Arc::new(resolver_with(repository.clone()));
        let session = session_for(user_id);

        let (first, second) = tokio::join!(resolver.resolve(&session), resolver.resolve(&session));

        assert!(matches!(first.unwrap(), Resolution::Resolved(_)));
        assert!(matches!(second.unwrap(), Resolution::Resolved(_)));
        assert_eq!(repository.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_resolution_served_from_cache() {
        let user_id = Uuid::new_v4();
        let repository = Arc::new(MockRepository::default());
        *repository.profile.lock().unwrap() = Some(profile_for(user_id));

        let resolver = resolver_with(repository.clone());
        let session = session_for(user_id);
        resolver.resolve(&session).await.unwrap();
        resolver.resolve(&session).await.unwrap();

        assert_eq!(repository.find_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_identity_mismatch_is_fatal() {
        let repository = Arc::new(MockRepository::default());
        let resolver = resolver_with(repository);

        // A fetched row whose id differs from the session subject must be
        // rejected, never cached.
        let foreign = profile_for(Uuid::new_v4());
        let err = resolver
            .accept(&session_for(Uuid::new_v4()), foreign)
            .await
            .unwrap_err();

        assert!(err.is_identity_mismatch());
        assert!(resolver.current().await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_backend_clears_session() {
        let repository = Arc::new(MockRepository::default());
        repository.find_fails.store(true, Ordering::SeqCst);

        let resolver = resolver_with(repository);
        let resolution = resolver.resolve(&session_for(Uuid::new_v4())).await.unwrap();

        assert_eq!(resolution, Resolution::ClearSession);
    }

    #[tokio::test]
    async fn test_hanging_fetch_times_out_to_clear_session() {
        let repository = Arc::new(MockRepository::default());
        repository.find_hangs.store(true, Ordering::SeqCst);

        let resolver = resolver_with(repository);
        let resolution = resolver.resolve(&session_for(Uuid::new_v4())).await.unwrap();

        assert_eq!(resolution, Resolution::ClearSession);
    }

    #[tokio::test]
    async fn test_refresh_keeps_cache_on_transient_failure() {
        let user_id = Uuid::new_v4();
        let repository = Arc::new(MockRepository::default());
        *repository.profile.lock().unwrap() = Some(profile_for(user_id));

        let resolver = resolver_with(repository.clone());
        let session = session_for(user_id);
        resolver.resolve(&session).await.unwrap();

        repository.find_fails.store(true, Ordering::SeqCst);
        let resolution = resolver.refresh(&session).await.unwrap();

        assert!(matches!(resolution, Resolution::Resolved(_)));
        assert!(resolver.current().await.is_some());
    }

    #[tokio::test]
    async fn test_lost_creation_race_recovers_by_refetch() {
        let user_id = Uuid::new_v4();
        let repository = Arc::new(MockRepository::default());
        repository.create_fails.store(true, Ordering::SeqCst);

        let resolver = resolver_with(repository.clone());
        let session = session_for(user_id);

        // First attempt: find misses, create conflicts, and the re-fetch
        // still misses, so the conservative path wins.
        let resolution = resolver.resolve(&session).await.unwrap();
        assert_eq!(resolution, Resolution::ClearSession);

        // Second attempt: the winner's row is now visible to the re-fetch.
        *repository.profile.lock().unwrap() = Some(profile_for(user_id));
        let resolution = resolver.resolve(&session).await.unwrap();
        assert!(matches!(resolution, Resolution::Resolved(_)));
    }

    #[tokio::test]
    async fn test_invalidate_drops_cache() {
        let user_id = Uuid::new_v4();
        let repository = Arc::new(MockRepository::default());
        *repository.profile.lock().unwrap() = Some(profile_for(user_id));

        let resolver = resolver_with(repository);
        resolver.resolve(&session_for(user_id)).await.unwrap();
        resolver.invalidate().await;

        assert!(resolver.current().await.is_none());
    }
}
