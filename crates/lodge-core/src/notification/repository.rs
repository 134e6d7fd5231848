//! Notification repository trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::notification::model::Notification;

/// Request/response operations against the notification store.
///
/// The push side is covered separately by [`crate::notification::NotificationFeed`].
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Lists notifications for a recipient, newest first.
    async fn list_for(&self, recipient_id: Uuid) -> Result<Vec<Notification>>;

    /// Number of unread notifications for a recipient.
    async fn unread_count(&self, recipient_id: Uuid) -> Result<u64>;

    /// Marks one notification read.
    async fn mark_as_read(&self, id: Uuid) -> Result<()>;

    /// Marks every notification for a recipient read.
    async fn mark_all_as_read(&self, recipient_id: Uuid) -> Result<()>;

    /// Deletes one notification.
    async fn delete(&self, id: Uuid) -> Result<()>;
}
