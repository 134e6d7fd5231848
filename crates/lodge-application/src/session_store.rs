//! The session store: single source of truth for "is there a valid
//! credential, and what is it".
//!
//! Holds the in-memory session, keeps the persisted copy in sync, and fans
//! out [`AuthEvent`]s to any number of subscribers over a broadcast
//! channel. All transitions flow through here so listeners observe them in
//! occurrence order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lodge_core::session::{
    AuthEvent, AuthGateway, Credentials, Session, SessionTokenStorage,
};
use lodge_core::{LodgeError, Result};
use tokio::sync::{broadcast, RwLock};

/// Default ceiling on the whole session bootstrap step. Without it a
/// hanging fetch would pin the blocking loading screen forever.
const DEFAULT_BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(15);

/// Default ceiling on the best-effort remote part of logout.
const DEFAULT_SIGNOUT_TIMEOUT: Duration = Duration::from_secs(5);

/// Capacity of the auth event channel. Transitions are rare; a lagging
/// receiver only ever misses intermediate states.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Tuning knobs for [`SessionStore`]. Tests shrink the timeouts.
#[derive(Debug, Clone)]
pub struct SessionStoreOptions {
    pub bootstrap_timeout: Duration,
    pub signout_timeout: Duration,
}

impl Default for SessionStoreOptions {
    fn default() -> Self {
        Self {
            bootstrap_timeout: DEFAULT_BOOTSTRAP_TIMEOUT,
            signout_timeout: DEFAULT_SIGNOUT_TIMEOUT,
        }
    }
}

/// Single owner of the session credential.
pub struct SessionStore {
    gateway: Arc<dyn AuthGateway>,
    storage: Arc<dyn SessionTokenStorage>,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
    /// True until the first bootstrap finishes (successfully or not).
    loading: AtomicBool,
    /// Set by the first `bootstrap` call; later calls return immediately so
    /// concurrent subscribers cannot trigger a duplicate fetch.
    bootstrap_started: AtomicBool,
    options: SessionStoreOptions,
}

impl SessionStore {
    pub fn new(gateway: Arc<dyn AuthGateway>, storage: Arc<dyn SessionTokenStorage>) -> Self {
        Self::with_options(gateway, storage, SessionStoreOptions::default())
    }

    pub fn with_options(
        gateway: Arc<dyn AuthGateway>,
        storage: Arc<dyn SessionTokenStorage>,
        options: SessionStoreOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            gateway,
            storage,
            session: RwLock::new(None),
            events,
            loading: AtomicBool::new(true),
            bootstrap_started: AtomicBool::new(false),
            options,
        }
    }

    /// Registers a listener for session transitions. Any number of
    /// receivers may exist; each sees events in occurrence order.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Returns the cached session without forcing a network call.
    pub async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// True while the initial bootstrap has not completed.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Restores the persisted session, if any.
    ///
    /// Runs at most once per store; concurrent or repeated calls return
    /// the current cached state without another fetch. The whole step runs
    /// under a safety timeout, and every failure mode degrades to "no
    /// session" so the caller falls through to the login guard instead of
    /// an error screen or an infinite spinner.
    pub async fn bootstrap(&self) -> Option<Session> {
        if self.bootstrap_started.swap(true, Ordering::SeqCst) {
            return self.current_session().await;
        }

        let restored = match tokio::time::timeout(self.options.bootstrap_timeout, self.restore())
            .await
        {
            Ok(session) => session,
            Err(_) => {
                tracing::warn!(
                    "[SessionStore] Bootstrap timed out after {:?}, continuing without a session",
                    self.options.bootstrap_timeout
                );
                None
            }
        };

        if let Some(session) = restored.clone() {
            *self.session.write().await = Some(session.clone());
            self.emit(AuthEvent::SignedIn { session });
        }

        self.loading.store(false, Ordering::SeqCst);
        restored
    }

    /// Inner bootstrap: load the persisted copy, refresh it when expired.
    async fn restore(&self) -> Option<Session> {
        let stored = match self.storage.load().await {
            Ok(stored) => stored?,
            Err(err) => {
                tracing::warn!("[SessionStore] Failed to load persisted session: {}", err);
                return None;
            }
        };

        if !stored.is_expired() {
            return Some(stored);
        }

        match self.gateway.refresh(&stored.refresh_token).await {
            Ok(fresh) => {
                self.persist(&fresh).await;
                Some(fresh)
            }
            Err(err) if err.is_auth() => {
                // The refresh token is dead; drop the persisted copy so the
                // next start does not retry it.
                tracing::info!("[SessionStore] Persisted session rejected, clearing: {}", err);
                if let Err(clear_err) = self.storage.clear().await {
                    tracing::warn!("[SessionStore] Failed to clear session file: {}", clear_err);
                }
                None
            }
            Err(err) => {
                tracing::warn!("[SessionStore] Session refresh failed during bootstrap: {}", err);
                None
            }
        }
    }

    /// Signs in with credentials. Authentication errors surface verbatim
    /// and are never retried here.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Session> {
        let session = self.gateway.sign_in(credentials).await?;

        *self.session.write().await = Some(session.clone());
        self.persist(&session).await;
        self.loading.store(false, Ordering::SeqCst);
        self.emit(AuthEvent::SignedIn {
            session: session.clone(),
        });

        Ok(session)
    }

    /// Forces a session re-validation through the gateway.
    ///
    /// A rotation that keeps the subject id emits `TokenRefreshed`, which
    /// downstream consumers must treat as a non-event for profile state —
    /// this is the de-duplication rule that stops a silent token rotation
    /// from remounting half the application. A changed subject is a real
    /// sign-in.
    pub async fn refresh(&self) -> Result<Option<Session>> {
        let current = self.current_session().await;
        let Some(current) = current else {
            return Ok(None);
        };

        match self.gateway.refresh(&current.refresh_token).await {
            Ok(fresh) => {
                let subject_changed = fresh.user_id != current.user_id;
                *self.session.write().await = Some(fresh.clone());
                self.persist(&fresh).await;

                if subject_changed {
                    tracing::warn!(
                        "[SessionStore] Subject changed on refresh ({} -> {})",
                        current.user_id,
                        fresh.user_id
                    );
                    self.emit(AuthEvent::SignedIn {
                        session: fresh.clone(),
                    });
                } else {
                    self.emit(AuthEvent::TokenRefreshed {
                        session: fresh.clone(),
                    });
                }
                Ok(Some(fresh))
            }
            Err(err) if err.is_auth() => {
                // The credential is dead server-side; holding on to it
                // locally would wedge every subsequent call.
                self.clear_local().await;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Signs out. The remote call is best effort and bounded; local state
    /// is cleared and `SignedOut` emitted regardless of its outcome, so a
    /// failed or hung remote call can never leave a stale local session.
    pub async fn logout(&self) {
        let session = self.current_session().await;

        if let Some(session) = session {
            match tokio::time::timeout(
                self.options.signout_timeout,
                self.gateway.sign_out(&session.access_token),
            )
            .await
            {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!("[SessionStore] Remote sign-out failed: {}", err);
                }
                Err(_) => {
                    tracing::warn!(
                        "[SessionStore] Remote sign-out timed out after {:?}",
                        self.options.signout_timeout
                    );
                }
            }
        }

        self.clear_local().await;
    }

    /// Adopts the session carried by an out-of-band recovery link and
    /// raises the `PasswordRecovery` event.
    pub async fn mark_recovery(&self, session: Session) {
        *self.session.write().await = Some(session.clone());
        self.persist(&session).await;
        self.loading.store(false, Ordering::SeqCst);
        self.emit(AuthEvent::PasswordRecovery { session });
    }

    /// Sets a new password and re-validates the session.
    pub async fn complete_password_reset(&self, new_password: &str) -> Result<()> {
        let session = self
            .current_session()
            .await
            .ok_or_else(|| LodgeError::auth("No active session for password reset"))?;

        self.gateway
            .update_password(&session.access_token, new_password)
            .await?;
        self.refresh().await?;
        Ok(())
    }

    /// Clears local state and notifies listeners. Used by logout and by
    /// forced re-authentication paths.
    async fn clear_local(&self) {
        *self.session.write().await = None;
        if let Err(err) = self.storage.clear().await {
            tracing::warn!("[SessionStore] Failed to clear session file: {}", err);
        }
        self.emit(AuthEvent::SignedOut);
    }

    async fn persist(&self, session: &Session) {
        if let Err(err) = self.storage.store(session).await {
            // Persistence is durability across restarts, not correctness
            // of the running process; keep going on the in-memory copy.
            tracing::warn!("[SessionStore] Failed to persist session: {}", err);
        }
    }

    fn emit(&self, event: AuthEvent) {
        // Send fails only when no receiver exists, which is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use lodge_core::session::IdentityClaims;
    use uuid::Uuid;

    use super::*;

    fn session_for(user_id: Uuid, expires_in_secs: i64) -> Session {
        Session {
            user_id,
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + ChronoDuration::seconds(expires_in_secs),
            claims: IdentityClaims::default(),
        }
    }

    fn fast_options() -> SessionStoreOptions {
        SessionStoreOptions {
            bootstrap_timeout: Duration::from_millis(100),
            signout_timeout: Duration::from_millis(100),
        }
    }

    /// Gateway whose behavior per call is scripted by the test.
    #[derive(Default)]
    struct MockGateway {
        sign_in_result: Mutex<Option<Result<Session>>>,
        refresh_result: Mutex<Option<Result<Session>>>,
        sign_out_fails: AtomicBool,
        sign_out_hangs: AtomicBool,
        sign_out_calls: AtomicUsize,
        refresh_calls: AtomicUsize,
    }

    #[async_trait]
    impl AuthGateway for MockGateway {
        async fn sign_in(&self, _credentials: &Credentials) -> Result<Session> {
            self.sign_in_result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(LodgeError::auth("no scripted sign-in")))
        }

        async fn sign_out(&self, _access_token: &str) -> Result<()> {
            self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
            if self.sign_out_hangs.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.sign_out_fails.load(Ordering::SeqCst) {
                Err(LodgeError::network("sign-out unreachable"))
            } else {
                Ok(())
            }
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<Session> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            self.refresh_result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(LodgeError::network("no scripted refresh")))
        }

        async fn update_password(&self, _access_token: &str, _new_password: &str) -> Result<()> {
            Ok(())
        }

        async fn request_password_recovery(&self, _email: &str) -> Result<()> {
            Ok(())
        }
    }

    /// In-memory storage with call counters; can be made to hang.
    #[derive(Default)]
    struct MockStorage {
        session: Mutex<Option<Session>>,
        load_calls: AtomicUsize,
        hangs: AtomicBool,
    }

    #[async_trait]
    impl SessionTokenStorage for MockStorage {
        async fn load(&self) -> Result<Option<Session>> {
            self.load_calls.fetch_add(1, Ordering::SeqCst);
            if self.hangs.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            Ok(self.session.lock().unwrap().clone())
        }

        async fn store(&self, session: &Session) -> Result<()> {
            *self.session.lock().unwrap() = Some(session.clone());
            Ok(())
        }

        async fn clear(&self) -> Result<()> {
            *self.session.lock().unwrap() = None;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_bootstrap_restores_fresh_persisted_session() {
        let gateway = Arc::new(MockGateway::default());
        let storage = Arc::new(MockStorage::default());
        *storage.session.lock().unwrap() = Some(session_for(Uuid::new_v4(), 3600));

        let store = SessionStore::with_options(gateway.clone(), storage.clone(), fast_options());
        let mut events = store.subscribe();

        let restored = store.bootstrap().await;
        assert!(restored.is_some());
        assert!(!store.is_loading());
        // Fresh session restored without any network call.
        assert_eq!(gateway.refresh_calls.load(Ordering::SeqCst), 0);
        assert!(matches!(
            events.recv().await.unwrap(),
            AuthEvent::SignedIn { .. }
        ));
    }

    #[tokio::test]
    async fn test_bootstrap_refreshes_expired_session() {
        let user_id = Uuid::new_v4();
        let gateway = Arc::new(MockGateway::default());
        *gateway.refresh_result.lock().unwrap() = Some(Ok(session_for(user_id, 3600)));
        let storage = Arc::new(MockStorage::default());
        *storage.session.lock().unwrap() = Some(session_for(user_id, -60));

        let store = SessionStore::with_options(gateway.clone(), storage, fast_options());
        let restored = store.bootstrap().await;

        assert_eq!(restored.unwrap().user_id, user_id);
        assert_eq!(gateway.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_runs_at_most_once() {
        let gateway = Arc::new(MockGateway::default());
        let storage = Arc::new(MockStorage::default());
        *storage.session.lock().unwrap() = Some(session_for(Uuid::new_v4(), 3600));

        let store = Arc::new(SessionStore::with_options(
            gateway,
            storage.clone(),
            fast_options(),
        ));

        let (first, second) = tokio::join!(store.bootstrap(), store.bootstrap());
        assert!(first.is_some() || second.is_some());
        assert_eq!(storage.load_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hanging_bootstrap_hits_safety_timeout() {
        let gateway = Arc::new(MockGateway::default());
        let storage = Arc::new(MockStorage::default());
        storage.hangs.store(true, Ordering::SeqCst);

        let store = SessionStore::with_options(gateway, storage, fast_options());
        let restored = store.bootstrap().await;

        // Degrades to "no session" instead of spinning forever.
        assert!(restored.is_none());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_remote_fails() {
        let user_id = Uuid::new_v4();
        let gateway = Arc::new(MockGateway::default());
        gateway.sign_out_fails.store(true, Ordering::SeqCst);
        *gateway.sign_in_result.lock().unwrap() = Some(Ok(session_for(user_id, 3600)));
        let storage = Arc::new(MockStorage::default());

        let store = SessionStore::with_options(gateway.clone(), storage.clone(), fast_options());
        store
            .sign_in(&Credentials {
                email: "jo@example.com".to_string(),
                password: "pw".to_string(),
            })
            .await
            .unwrap();

        let mut events = store.subscribe();
        store.logout().await;

        assert_eq!(gateway.sign_out_calls.load(Ordering::SeqCst), 1);
        assert!(store.current_session().await.is_none());
        assert!(storage.session.lock().unwrap().is_none());
        assert!(matches!(events.recv().await.unwrap(), AuthEvent::SignedOut));
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_remote_hangs() {
        let gateway = Arc::new(MockGateway::default());
        gateway.sign_out_hangs.store(true, Ordering::SeqCst);
        *gateway.sign_in_result.lock().unwrap() = Some(Ok(session_for(Uuid::new_v4(), 3600)));

        let store = SessionStore::with_options(
            gateway,
            Arc::new(MockStorage::default()),
            fast_options(),
        );
        store
            .sign_in(&Credentials {
                email: "jo@example.com".to_string(),
                password: "pw".to_string(),
            })
            .await
            .unwrap();

        store.logout().await;
        assert!(store.current_session().await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_same_subject_emits_token_refreshed() {
        let user_id = Uuid::new_v4();
        let gateway = Arc::new(MockGateway::default());
        *gateway.sign_in_result.lock().unwrap() = Some(Ok(session_for(user_id, 3600)));
        *gateway.refresh_result.lock().unwrap() = Some(Ok(session_for(user_id, 7200)));

        let store = SessionStore::with_options(
            gateway,
            Arc::new(MockStorage::default()),
            fast_options(),
        );
        store
            .sign_in(&Credentials {
                email: "jo@example.com".to_string(),
                password: "pw".to_string(),
            })
            .await
            .unwrap();

        let mut events = store.subscribe();
        store.refresh().await.unwrap();

        assert!(matches!(
            events.recv().await.unwrap(),
            AuthEvent::TokenRefreshed { .. }
        ));
    }

    #[tokio::test]
    async fn test_refresh_rejected_token_forces_signout() {
        let gateway = Arc::new(MockGateway::default());
        *gateway.sign_in_result.lock().unwrap() = Some(Ok(session_for(Uuid::new_v4(), 3600)));
        *gateway.refresh_result.lock().unwrap() =
            Some(Err(LodgeError::auth("refresh token revoked")));

        let store = SessionStore::with_options(
            gateway,
            Arc::new(MockStorage::default()),
            fast_options(),
        );
        store
            .sign_in(&Credentials {
                email: "jo@example.com".to_string(),
                password: "pw".to_string(),
            })
            .await
            .unwrap();

        let mut events = store.subscribe();
        assert!(store.refresh().await.is_err());
        assert!(store.current_session().await.is_none());
        assert!(matches!(events.recv().await.unwrap(), AuthEvent::SignedOut));
    }

    #[tokio::test]
    async fn test_login_then_logout_sequences_leave_no_session() {
        let user_id = Uuid::new_v4();
        let gateway = Arc::new(MockGateway::default());
        let storage = Arc::new(MockStorage::default());
        let store = SessionStore::with_options(gateway.clone(), storage, fast_options());

        for round in 0..3 {
            gateway.sign_out_fails.store(round % 2 == 0, Ordering::SeqCst);
            *gateway.sign_in_result.lock().unwrap() = Some(Ok(session_for(user_id, 3600)));
            store
                .sign_in(&Credentials {
                    email: "jo@example.com".to_string(),
                    password: "pw".to_string(),
                })
                .await
                .unwrap();
            store.logout().await;
            assert!(store.current_session().await.is_none());
        }
    }
}
