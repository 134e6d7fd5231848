//! Polling notification feed.
//!
//! The hosted backend's websocket transport is not used here; instead the
//! feed is modeled explicitly as a long-lived polling task with its own
//! reconnect/backoff policy. The cursor query uses `gte` on the last seen
//! timestamp, so rows at the boundary can be delivered twice — the feed is
//! at-least-once by construction and consumers dedupe by id, as the
//! `NotificationFeed` contract requires.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lodge_core::notification::{FeedHandle, Notification, NotificationFeed};
use lodge_core::Result;
use lodge_infrastructure::BackendConfig;
use rand::Rng;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::http::{TokenCell, REQUEST_TIMEOUT_SECS};

/// Upper bound for the error backoff delay.
const BACKOFF_CAP: Duration = Duration::from_secs(60);
/// Random jitter added to every sleep, in milliseconds.
const JITTER_MS: u64 = 250;

/// Exponential backoff: starts at the poll interval, doubles per
/// consecutive error, resets on success.
#[derive(Debug)]
struct Backoff {
    base: Duration,
    current: Duration,
}

impl Backoff {
    fn new(base: Duration) -> Self {
        Self {
            base,
            current: base,
        }
    }

    /// Delay to use after a success.
    fn reset(&mut self) -> Duration {
        self.current = self.base;
        self.current
    }

    /// Delay to use after a failure; doubles up to the cap.
    fn next(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(BACKOFF_CAP);
        delay
    }
}

/// `NotificationFeed` implementation that polls the notifications table.
#[derive(Clone)]
pub struct PollingNotificationFeed {
    client: Client,
    base_url: String,
    anon_key: String,
    token: TokenCell,
    poll_interval: Duration,
}

impl PollingNotificationFeed {
    pub fn new(config: &BackendConfig, token: TokenCell) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            token,
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
        }
    }

    async fn fetch_since(
        &self,
        recipient_id: Uuid,
        cursor: DateTime<Utc>,
    ) -> Result<Vec<Notification>> {
        let url = format!(
            "{}/rest/v1/notifications?recipient_id=eq.{}&created_at=gte.{}&select=*&order=created_at.asc",
            self.base_url,
            recipient_id,
            cursor.to_rfc3339()
        );
        let bearer = self.token.bearer_or(&self.anon_key).await;
        let response = self
            .client
            .get(&url)
            .header("apikey", &self.anon_key)
            .header("authorization", format!("Bearer {}", bearer))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|err| crate::http::map_send_error("notification poll", err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(crate::http::map_data_status("notification poll", status, &body));
        }

        response.json().await.map_err(|err| {
            lodge_core::LodgeError::network(format!("notification poll: malformed response: {}", err))
        })
    }
}

#[async_trait]
impl NotificationFeed for PollingNotificationFeed {
    async fn open(
        &self,
        recipient_id: Uuid,
        sink: mpsc::Sender<Notification>,
    ) -> Result<FeedHandle> {
        let cancel = CancellationToken::new();
        let handle = FeedHandle::new(cancel.clone());

        let feed = self.clone();
        tokio::spawn(async move {
            feed.poll_loop(recipient_id, sink, cancel).await;
        });

        Ok(handle)
    }
}

impl PollingNotificationFeed {
    async fn poll_loop(
        self,
        recipient_id: Uuid,
        sink: mpsc::Sender<Notification>,
        cancel: CancellationToken,
    ) {
        let mut cursor = Utc::now();
        let mut backoff = Backoff::new(self.poll_interval);
        let mut delay = self.poll_interval;

        tracing::info!(
            "[NotificationFeed] Polling started for {} ({}s interval)",
            recipient_id,
            self.poll_interval.as_secs()
        );

        loop {
            let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=JITTER_MS));
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay + jitter) => {}
            }

            match self.fetch_since(recipient_id, cursor).await {
                Ok(rows) => {
                    for notification in rows {
                        if notification.created_at > cursor {
                            cursor = notification.created_at;
                        }
                        if sink.send(notification).await.is_err() {
                            // Receiver gone: the owning scope was torn down.
                            tracing::info!(
                                "[NotificationFeed] Sink closed, stopping poll for {}",
                                recipient_id
                            );
                            return;
                        }
                    }
                    delay = backoff.reset();
                }
                Err(err) => {
                    delay = backoff.next();
                    tracing::warn!(
                        "[NotificationFeed] Poll failed ({}), retrying in {:?}",
                        err,
                        delay
                    );
                }
            }
        }

        tracing::info!("[NotificationFeed] Polling stopped for {}", recipient_id);
    }
}
