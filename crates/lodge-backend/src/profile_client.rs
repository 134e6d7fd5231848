//! HTTP implementation of the profile repository.
//!
//! Uses the backend's auto-generated REST conventions for the `profiles`
//! table: equality filters in the query string, `Prefer:
//! return=representation` to get the affected row back, 409 on a creation
//! conflict.

use std::time::Duration;

use async_trait::async_trait;
use lodge_core::profile::{NewProfile, Profile, ProfileRepository};
use lodge_core::{LodgeError, Result};
use lodge_infrastructure::BackendConfig;
use reqwest::{Client, StatusCode};
use uuid::Uuid;

use crate::http::{map_data_status, map_send_error, TokenCell, REQUEST_TIMEOUT_SECS};

/// Profile repository over the backend's table REST API.
#[derive(Clone)]
pub struct HttpProfileRepository {
    client: Client,
    base_url: String,
    anon_key: String,
    token: TokenCell,
}

impl HttpProfileRepository {
    pub fn new(config: &BackendConfig, token: TokenCell) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            token,
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/profiles", self.base_url)
    }

    async fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let bearer = self.token.bearer_or(&self.anon_key).await;
        builder
            .header("apikey", &self.anon_key)
            .header("authorization", format!("Bearer {}", bearer))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }
}

#[async_trait]
impl ProfileRepository for HttpProfileRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>> {
        let url = format!("{}?id=eq.{}&select=*", self.table_url(), id);
        let response = self
            .request(self.client.get(&url))
            .await
            .send()
            .await
            .map_err(|err| map_send_error("profile fetch", err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(map_data_status("profile fetch", status, &body));
        }

        // Equality filters return an array; empty means no such row.
        let mut rows: Vec<Profile> = response
            .json()
            .await
            .map_err(|err| LodgeError::network(format!("profile fetch: malformed response: {}", err)))?;
        Ok(rows.pop())
    }

    async fn create(&self, profile: &NewProfile) -> Result<Profile> {
        let response = self
            .request(self.client.post(self.table_url()).json(profile))
            .await
            .header("prefer", "return=representation")
            .send()
            .await
            .map_err(|err| map_send_error("profile create", err))?;

        match response.status() {
            StatusCode::CONFLICT => {
                // Lost a creation race; the caller re-fetches the winner.
                Err(LodgeError::internal(format!(
                    "profile {} already exists",
                    profile.id
                )))
            }
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(map_data_status("profile create", status, &body))
            }
            _ => {
                let mut rows: Vec<Profile> = response.json().await.map_err(|err| {
                    LodgeError::network(format!("profile create: malformed response: {}", err))
                })?;
                rows.pop()
                    .ok_or_else(|| LodgeError::internal("profile create returned no row"))
            }
        }
    }

    async fn update(&self, profile: &Profile) -> Result<Profile> {
        let url = format!("{}?id=eq.{}", self.table_url(), profile.id);
        let response = self
            .request(self.client.patch(&url).json(profile))
            .await
            .header("prefer", "return=representation")
            .send()
            .await
            .map_err(|err| map_send_error("profile update", err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(map_data_status("profile update", status, &body));
        }

        let mut rows: Vec<Profile> = response
            .json()
            .await
            .map_err(|err| LodgeError::network(format!("profile update: malformed response: {}", err)))?;
        rows.pop()
            .ok_or_else(|| LodgeError::not_found("profile", profile.id.to_string()))
    }
}
