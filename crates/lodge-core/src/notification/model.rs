//! Notification domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A notification row as owned by the backend.
///
/// This layer only observes inserts and issues explicit read/delete calls;
/// it never owns the record's lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
    /// Optional navigation target: a view key, an in-app path, or an
    /// external URL. Resolved by the navigation resolver on click.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_link: Option<String>,
}
