//! Install/offline advisors.
//!
//! Passive environment observers. They surface advisory banners on watch
//! channels and never touch session, profile or view state — a banner is
//! presentation, not a guard.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Advisory banner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    /// Nothing to show.
    None,
    /// The backend is unreachable; the app keeps running on cached state.
    Offline,
    /// The app can be installed to the device and is not yet.
    InstallAvailable,
}

/// Environment probe for network connectivity.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Environment probe for installability.
pub trait InstallProbe: Send + Sync {
    fn is_installed(&self) -> bool;
    fn can_install(&self) -> bool;
}

/// Polls a connectivity probe and publishes an offline banner.
pub struct ConnectivityAdvisor {
    banner: watch::Sender<Advisory>,
    cancel: CancellationToken,
}

impl ConnectivityAdvisor {
    /// Starts polling `probe` every `interval`.
    pub fn start(probe: Arc<dyn ConnectivityProbe>, interval: Duration) -> Self {
        let (banner, _) = watch::channel(Advisory::None);
        let cancel = CancellationToken::new();

        let sender = banner.clone();
        let token = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }

                let advisory = if probe.is_online().await {
                    Advisory::None
                } else {
                    Advisory::Offline
                };
                if *sender.borrow() != advisory {
                    tracing::info!("[ConnectivityAdvisor] Banner -> {:?}", advisory);
                    let _ = sender.send(advisory);
                }
            }
        });

        Self { banner, cancel }
    }

    pub fn subscribe(&self) -> watch::Receiver<Advisory> {
        self.banner.subscribe()
    }

    pub fn current(&self) -> Advisory {
        *self.banner.borrow()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ConnectivityAdvisor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// One-shot installability check with local dismissal.
pub struct InstallAdvisor {
    banner: watch::Sender<Advisory>,
}

impl InstallAdvisor {
    /// Evaluates the probe once; installable-but-not-installed surfaces the
    /// banner.
    pub fn evaluate(probe: &dyn InstallProbe) -> Self {
        let advisory = if probe.can_install() && !probe.is_installed() {
            Advisory::InstallAvailable
        } else {
            Advisory::None
        };
        let (banner, _) = watch::channel(advisory);
        Self { banner }
    }

    pub fn subscribe(&self) -> watch::Receiver<Advisory> {
        self.banner.subscribe()
    }

    pub fn current(&self) -> Advisory {
        *self.banner.borrow()
    }

    /// Hides the banner for this run. The probe is not re-evaluated.
    pub fn dismiss(&self) {
        let _ = self.banner.send(Advisory::None);
    }
}
