//! HTTP implementation of the notification repository.

use std::time::Duration;

use async_trait::async_trait;
use lodge_core::notification::{Notification, NotificationRepository};
use lodge_core::{LodgeError, Result};
use lodge_infrastructure::BackendConfig;
use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

use crate::http::{
    map_data_status, map_send_error, parse_content_range_total, TokenCell, REQUEST_TIMEOUT_SECS,
};

#[derive(Serialize)]
struct MarkRead {
    read: bool,
}

/// Notification repository over the backend's table REST API.
#[derive(Clone)]
pub struct HttpNotificationRepository {
    client: Client,
    base_url: String,
    anon_key: String,
    token: TokenCell,
}

impl HttpNotificationRepository {
    pub fn new(config: &BackendConfig, token: TokenCell) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            token,
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/notifications", self.base_url)
    }

    async fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let bearer = self.token.bearer_or(&self.anon_key).await;
        builder
            .header("apikey", &self.anon_key)
            .header("authorization", format!("Bearer {}", bearer))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    async fn send_expecting_success(
        &self,
        operation: &'static str,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let response = self
            .request(builder)
            .await
            .send()
            .await
            .map_err(|err| map_send_error(operation, err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(map_data_status(operation, status, &body));
        }
        Ok(response)
    }
}

#[async_trait]
impl NotificationRepository for HttpNotificationRepository {
    async fn list_for(&self, recipient_id: Uuid) -> Result<Vec<Notification>> {
        let url = format!(
            "{}?recipient_id=eq.{}&select=*&order=created_at.desc",
            self.table_url(),
            recipient_id
        );
        let response = self
            .send_expecting_success("notification list", self.client.get(&url))
            .await?;

        response.json().await.map_err(|err| {
            LodgeError::network(format!("notification list: malformed response: {}", err))
        })
    }

    async fn unread_count(&self, recipient_id: Uuid) -> Result<u64> {
        // Ask only for the count: an empty range plus an exact-count
        // preference puts the total in the content-range header.
        let url = format!(
            "{}?recipient_id=eq.{}&read=is.false&select=id",
            self.table_url(),
            recipient_id
        );
        let response = self
            .send_expecting_success(
                "unread count",
                self.client
                    .get(&url)
                    .header("prefer", "count=exact")
                    .header("range", "0-0"),
            )
            .await?;

        let total = response
            .headers()
            .get("content-range")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range_total);

        total.ok_or_else(|| LodgeError::network("unread count: missing content-range header"))
    }

    async fn mark_as_read(&self, id: Uuid) -> Result<()> {
        let url = format!("{}?id=eq.{}", self.table_url(), id);
        self.send_expecting_success(
            "mark notification read",
            self.client.patch(&url).json(&MarkRead { read: true }),
        )
        .await?;
        Ok(())
    }

    async fn mark_all_as_read(&self, recipient_id: Uuid) -> Result<()> {
        let url = format!(
            "{}?recipient_id=eq.{}&read=is.false",
            self.table_url(),
            recipient_id
        );
        self.send_expecting_success(
            "mark all notifications read",
            self.client.patch(&url).json(&MarkRead { read: true }),
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let url = format!("{}?id=eq.{}", self.table_url(), id);
        self.send_expecting_success("delete notification", self.client.delete(&url))
            .await?;
        Ok(())
    }
}
