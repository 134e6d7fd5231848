//! Real-time notification feed trait.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::Result;
use crate::notification::model::Notification;

/// Push delivery of newly inserted notifications.
///
/// Contract: delivery is at-least-once — duplicates are possible after a
/// reconnect, and consumers must dedupe by notification id. Ordering is not
/// guaranteed beyond "eventually, after the insert commits". Reconnection
/// is the implementation's responsibility; consumers only tear down the
/// returned handle.
#[async_trait]
pub trait NotificationFeed: Send + Sync {
    /// Opens a feed for a recipient. Inserts are delivered on `sink` until
    /// the returned handle is closed or dropped.
    async fn open(
        &self,
        recipient_id: Uuid,
        sink: mpsc::Sender<Notification>,
    ) -> Result<FeedHandle>;
}

/// Handle to an open feed. Closing (or dropping) it cancels the underlying
/// delivery task; release is mandatory when the owning scope goes away.
#[derive(Debug)]
pub struct FeedHandle {
    cancel: CancellationToken,
}

impl FeedHandle {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Stops delivery. Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// True once the feed has been told to stop.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
