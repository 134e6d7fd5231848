//! The application controller: owner of the guard flags and the current
//! view, and the only writer of the published [`AppPhase`].
//!
//! The controller consumes [`AuthEvent`]s on a background task, drives the
//! profile resolver, and re-evaluates the guard table after every
//! transition. Consumers watch the phase channel and render whatever it
//! says; they never compute guard logic themselves.

use std::sync::Arc;

use chrono::Utc;
use lodge_core::navigation::{self, ExternalOpener, NavAction};
use lodge_core::phase::{resolve_phase, AppPhase, ShellSnapshot};
use lodge_core::profile::AccessMode;
use lodge_core::session::{AuthEvent, Credentials, Session};
use lodge_core::view::View;
use lodge_core::Result;
use tokio::sync::{broadcast, watch, RwLock};
use tokio_util::sync::CancellationToken;

use crate::profile_resolver::{ProfileResolver, Resolution};
use crate::session_store::SessionStore;

/// Ephemeral guard flags owned by the controller.
#[derive(Debug, Clone)]
struct ControllerState {
    bootstrapping: bool,
    recovery_pending: bool,
    access_mode: Option<AccessMode>,
    show_onboarding: bool,
    view: View,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            bootstrapping: true,
            recovery_pending: false,
            access_mode: None,
            show_onboarding: true,
            view: View::default(),
        }
    }
}

/// Orchestrates session, profile and view state for one app instance.
pub struct AppController {
    session_store: Arc<SessionStore>,
    resolver: Arc<ProfileResolver>,
    external: Arc<dyn ExternalOpener>,
    state: RwLock<ControllerState>,
    phase_tx: watch::Sender<AppPhase>,
    shutdown: CancellationToken,
}

impl AppController {
    pub fn new(
        session_store: Arc<SessionStore>,
        resolver: Arc<ProfileResolver>,
        external: Arc<dyn ExternalOpener>,
    ) -> Arc<Self> {
        let (phase_tx, _) = watch::channel(AppPhase::AuthBootstrapping);
        Arc::new(Self {
            session_store,
            resolver,
            external,
            state: RwLock::new(ControllerState::default()),
            phase_tx,
            shutdown: CancellationToken::new(),
        })
    }

    /// Starts the event loop and performs the initial bootstrap pass.
    ///
    /// The event loop is subscribed before the bootstrap so no transition
    /// is missed; the initial profile resolution also happens inline here,
    /// which keeps the blocking-loading phase up until the first
    /// resolution settles. The resolver's cache makes the overlap with the
    /// event loop's own `SignedIn` handling collapse into one fetch.
    pub async fn run(self: &Arc<Self>) {
        self.spawn_event_loop();

        self.recompute().await;
        let restored = self.session_store.bootstrap().await;
        if let Some(session) = restored {
            self.resolve_profile(&session).await;
        }

        self.state.write().await.bootstrapping = false;
        self.recompute().await;
    }

    /// Stops the event loop. Subscriptions must not outlive the owning
    /// context.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// The currently published phase.
    pub fn phase(&self) -> AppPhase {
        *self.phase_tx.borrow()
    }

    /// Watch channel carrying every phase change.
    pub fn watch_phase(&self) -> watch::Receiver<AppPhase> {
        self.phase_tx.subscribe()
    }

    /// The current view inside the main shell.
    pub async fn current_view(&self) -> View {
        self.state.read().await.view
    }

    pub fn session_store(&self) -> &Arc<SessionStore> {
        &self.session_store
    }

    pub fn resolver(&self) -> &Arc<ProfileResolver> {
        &self.resolver
    }

    /// Signs in; the event loop picks up the transition and resolves the
    /// profile.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<()> {
        self.session_store.sign_in(credentials).await?;
        Ok(())
    }

    /// Logs out and resets every ephemeral guard flag, landing directly on
    /// the login guard.
    pub async fn logout(&self) {
        self.session_store.logout().await;
        self.reset_ephemeral_state().await;
        self.recompute().await;
    }

    /// Records the privilege level an elevated user chose to operate under.
    pub async fn select_role(&self, mode: AccessMode) {
        self.state.write().await.access_mode = Some(mode);
        self.recompute().await;
    }

    /// Finishes the onboarding wizard: clears the local flag, persists the
    /// profile flag, and re-evaluates.
    pub async fn complete_onboarding(&self) {
        self.state.write().await.show_onboarding = false;

        if let Some(mut profile) = self.resolver.current().await {
            if !profile.onboarding_complete {
                profile.onboarding_complete = true;
                profile.updated_at = Utc::now();
                if let Err(err) = self.resolver.save(&profile).await {
                    // The local flag already hides the wizard for this run;
                    // the backend flag catches up on the next save.
                    tracing::warn!("[AppController] Failed to persist onboarding flag: {}", err);
                }
            }
        }

        self.recompute().await;
    }

    /// Adopts a recovery-link session; the phase switches to the
    /// password-reset form.
    pub async fn open_recovery(&self, session: Session) {
        self.session_store.mark_recovery(session).await;
    }

    /// Sets the new password, clears the recovery guard and resolves the
    /// profile for the now-validated session.
    pub async fn complete_password_reset(&self, new_password: &str) -> Result<()> {
        self.session_store
            .complete_password_reset(new_password)
            .await?;

        self.state.write().await.recovery_pending = false;
        if let Some(session) = self.session_store.current_session().await {
            self.resolve_profile(&session).await;
        }
        self.recompute().await;
        Ok(())
    }

    /// Switches the view inside the main shell. Guards above `Main` are
    /// unaffected.
    pub async fn set_view(&self, view: View) {
        self.state.write().await.view = view;
        self.recompute().await;
    }

    /// Resolves an arbitrary navigation instruction: either a view switch
    /// or an external open, never both.
    pub async fn navigate(&self, target: &str) {
        match navigation::resolve(target) {
            NavAction::SetView { view } => self.set_view(view).await,
            NavAction::OpenExternal { url } => self.external.open(&url),
        }
    }

    fn spawn_event_loop(self: &Arc<Self>) {
        let controller = Arc::clone(self);
        let mut events = self.session_store.subscribe();
        let cancel = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Ok(AuthEvent::SignedIn { session }) => {
                            controller.resolve_profile(&session).await;
                        }
                        Ok(AuthEvent::TokenRefreshed { .. }) => {
                            // Same subject, new token: deliberately no
                            // profile work and no state change downstream.
                        }
                        Ok(AuthEvent::SignedOut) => {
                            controller.reset_ephemeral_state().await;
                            controller.recompute().await;
                        }
                        Ok(AuthEvent::PasswordRecovery { .. }) => {
                            controller.state.write().await.recovery_pending = true;
                            controller.recompute().await;
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(
                                "[AppController] Event loop lagged, skipped {} events",
                                skipped
                            );
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });
    }

    /// Resolves the profile for a session and applies the outcome. An
    /// unverifiable identity forces re-authentication rather than running
    /// under a constructed one.
    async fn resolve_profile(&self, session: &Session) {
        match self.resolver.resolve(session).await {
            Ok(Resolution::Resolved(_)) => {}
            Ok(Resolution::ClearSession) => {
                tracing::warn!(
                    "[AppController] Could not verify identity for {}, forcing re-authentication",
                    session.user_id
                );
                self.session_store.logout().await;
                self.reset_ephemeral_state().await;
            }
            Err(err) => {
                tracing::warn!(
                    "[AppController] Profile resolution failed fatally for {}: {}",
                    session.user_id,
                    err
                );
                self.session_store.logout().await;
                self.reset_ephemeral_state().await;
            }
        }
        self.recompute().await;
    }

    async fn reset_ephemeral_state(&self) {
        self.resolver.invalidate().await;
        let mut state = self.state.write().await;
        state.recovery_pending = false;
        state.access_mode = None;
        state.show_onboarding = true;
        state.view = View::default();
    }

    /// Rebuilds the guard snapshot and publishes the resulting phase.
    async fn recompute(&self) {
        let session = self.session_store.current_session().await;
        let profile = self.resolver.current().await;

        let mut state = self.state.write().await;

        // Defensive downgrade: a resolved non-elevated role invalidates a
        // stale admin flag before the snapshot is taken.
        if state.access_mode == Some(AccessMode::Admin) {
            if let Some(profile) = &profile {
                if !profile.role.is_elevated() {
                    tracing::warn!(
                        "[AppController] Clearing admin mode: role '{}' is not elevated",
                        profile.role
                    );
                    state.access_mode = None;
                }
            }
        }

        let snapshot = ShellSnapshot {
            bootstrapping: state.bootstrapping,
            recovery_pending: state.recovery_pending,
            authenticated: session.is_some(),
            role: profile.as_ref().map(|profile| profile.role),
            access_mode: state.access_mode,
            onboarding_complete: profile
                .as_ref()
                .map(|profile| profile.onboarding_complete)
                .unwrap_or(false),
            show_onboarding: state.show_onboarding,
        };
        drop(state);

        self.phase_tx.send_replace(resolve_phase(&snapshot));
    }
}
