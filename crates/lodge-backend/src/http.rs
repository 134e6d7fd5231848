//! Shared plumbing for the backend HTTP clients: the bearer-token cell and
//! error mapping helpers.

use std::sync::Arc;

use lodge_core::LodgeError;
use reqwest::StatusCode;
use tokio::sync::RwLock;

/// Request timeout applied by every backend client.
pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared cell holding the current user's access token.
///
/// Clients read it per request and fall back to the anonymous key when no
/// user is signed in. The embedder updates it on session transitions.
#[derive(Clone, Default)]
pub struct TokenCell {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current token.
    pub async fn set(&self, token: impl Into<String>) {
        *self.inner.write().await = Some(token.into());
    }

    /// Drops the current token (sign-out).
    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }

    pub async fn get(&self) -> Option<String> {
        self.inner.read().await.clone()
    }

    /// The bearer value to send: the user token when present, otherwise the
    /// anonymous key.
    pub(crate) async fn bearer_or(&self, anon_key: &str) -> String {
        self.get().await.unwrap_or_else(|| anon_key.to_string())
    }
}

/// Maps a transport-level failure to a `LodgeError`, distinguishing
/// timeouts for the logs.
pub(crate) fn map_send_error(operation: &str, err: reqwest::Error) -> LodgeError {
    if err.is_timeout() {
        LodgeError::timeout(operation)
    } else {
        LodgeError::network(format!("{} failed: {}", operation, err))
    }
}

/// Maps a non-success data-plane status (PostgREST/functions) to a
/// `LodgeError`.
pub(crate) fn map_data_status(operation: &str, status: StatusCode, body: &str) -> LodgeError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LodgeError::auth("Your session is no longer valid. Please sign in again.".to_string())
        }
        _ => LodgeError::network(format!(
            "{} failed with status {}: {}",
            operation,
            status.as_u16(),
            truncate(body, 200)
        )),
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Parses the total from a PostgREST `content-range` header
/// (`"0-9/42"` or `"*/42"`).
pub(crate) fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}
