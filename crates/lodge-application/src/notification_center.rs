//! The notification center: one underlying feed per recipient, fanned out
//! locally to any number of subscribers.
//!
//! The feed transport is at-least-once, so inserts are deduplicated by id
//! here before they touch the unread counter or reach subscribers. Insert
//! delivery is independent of the current phase — nothing in this module
//! assumes the main shell is mounted.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lodge_core::notification::{
    FeedHandle, Notification, NotificationFeed, NotificationRepository,
};
use lodge_core::Result;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Capacity of the per-recipient fan-out channel.
const FANOUT_CAPACITY: usize = 64;

/// The shared subscription for one recipient.
struct ActiveFeed {
    recipient_id: Uuid,
    fanout: broadcast::Sender<Notification>,
    handle: FeedHandle,
    cancel: CancellationToken,
}

/// Fan-out hub over the notification repository and feed.
pub struct NotificationCenter {
    repository: Arc<dyn NotificationRepository>,
    feed: Arc<dyn NotificationFeed>,
    active: Mutex<Option<ActiveFeed>>,
    unread: Arc<AtomicU64>,
}

impl NotificationCenter {
    pub fn new(
        repository: Arc<dyn NotificationRepository>,
        feed: Arc<dyn NotificationFeed>,
    ) -> Self {
        Self {
            repository,
            feed,
            active: Mutex::new(None),
            unread: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribes to inserts for a recipient.
    ///
    /// The first subscriber opens the underlying feed; later subscribers
    /// share it, so N badge/list consumers never cost N network channels.
    /// Subscribing for a different recipient tears the old feed down first.
    pub async fn subscribe(&self, recipient_id: Uuid) -> Result<broadcast::Receiver<Notification>> {
        let mut active = self.active.lock().await;

        if let Some(existing) = active.as_ref() {
            if existing.recipient_id == recipient_id {
                return Ok(existing.fanout.subscribe());
            }
            existing.cancel.cancel();
            existing.handle.close();
        }

        // Seed the unread counter before inserts start arriving. A failed
        // seed starts at zero rather than blocking the subscription.
        let seeded = match self.repository.unread_count(recipient_id).await {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!("[NotificationCenter] Failed to seed unread count: {}", err);
                0
            }
        };
        self.unread.store(seeded, Ordering::SeqCst);

        let (sink, deliveries) = mpsc::channel(FANOUT_CAPACITY);
        let handle = self.feed.open(recipient_id, sink).await?;

        let (fanout, _) = broadcast::channel(FANOUT_CAPACITY);
        let cancel = CancellationToken::new();
        self.spawn_fanout(deliveries, fanout.clone(), cancel.clone());

        let receiver = fanout.subscribe();
        *active = Some(ActiveFeed {
            recipient_id,
            fanout,
            handle,
            cancel,
        });

        Ok(receiver)
    }

    /// Current unread count as tracked locally.
    pub fn unread_count(&self) -> u64 {
        self.unread.load(Ordering::SeqCst)
    }

    /// Marks one notification read and decrements the local counter.
    pub async fn mark_as_read(&self, id: Uuid) -> Result<()> {
        self.repository.mark_as_read(id).await?;
        let _ = self
            .unread
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                Some(count.saturating_sub(1))
            });
        Ok(())
    }

    /// Marks everything read and zeroes the local counter.
    pub async fn mark_all_as_read(&self, recipient_id: Uuid) -> Result<()> {
        self.repository.mark_all_as_read(recipient_id).await?;
        self.unread.store(0, Ordering::SeqCst);
        Ok(())
    }

    /// Deletes a notification. The unread counter is left to the next list
    /// refresh; a deleted-but-unread row is an edge the backend count
    /// reconciles.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.repository.delete(id).await
    }

    /// Tears down the shared feed. Mandatory on logout; an orphaned feed
    /// would keep mutating counters for a signed-out user.
    pub async fn shutdown(&self) {
        let mut active = self.active.lock().await;
        if let Some(existing) = active.take() {
            existing.cancel.cancel();
            existing.handle.close();
        }
        self.unread.store(0, Ordering::SeqCst);
    }

    fn spawn_fanout(
        &self,
        mut deliveries: mpsc::Receiver<Notification>,
        fanout: broadcast::Sender<Notification>,
        cancel: CancellationToken,
    ) {
        let unread = Arc::clone(&self.unread);

        tokio::spawn(async move {
            let mut seen: HashSet<Uuid> = HashSet::new();
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    delivery = deliveries.recv() => match delivery {
                        Some(notification) => {
                            // At-least-once transport: only the first
                            // delivery of an id counts or propagates.
                            if !seen.insert(notification.id) {
                                continue;
                            }
                            if !notification.read {
                                unread.fetch_add(1, Ordering::SeqCst);
                            }
                            let _ = fanout.send(notification);
                        }
                        None => break,
                    }
                }
            }
        });
    }
}
