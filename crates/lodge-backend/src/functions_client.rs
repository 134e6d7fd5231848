//! HTTP implementation of the serverless function invoker.

use std::time::Duration;

use async_trait::async_trait;
use lodge_core::functions::FunctionInvoker;
use lodge_core::{LodgeError, Result};
use lodge_infrastructure::BackendConfig;
use reqwest::Client;
use serde_json::Value;

use crate::http::{map_data_status, map_send_error, TokenCell, REQUEST_TIMEOUT_SECS};

/// Function invoker over the backend's functions endpoint.
///
/// Results are advisory; callers are expected to treat errors permissively
/// rather than blocking the user on an ancillary check.
#[derive(Clone)]
pub struct HttpFunctionInvoker {
    client: Client,
    base_url: String,
    anon_key: String,
    token: TokenCell,
}

impl HttpFunctionInvoker {
    pub fn new(config: &BackendConfig, token: TokenCell) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            token,
        }
    }
}

#[async_trait]
impl FunctionInvoker for HttpFunctionInvoker {
    async fn invoke(&self, name: &str, payload: Value) -> Result<Value> {
        let url = format!("{}/functions/v1/{}", self.base_url, name);
        let bearer = self.token.bearer_or(&self.anon_key).await;

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .header("authorization", format!("Bearer {}", bearer))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .json(&payload)
            .send()
            .await
            .map_err(|err| map_send_error("function invoke", err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(map_data_status("function invoke", status, &body));
        }

        response
            .json()
            .await
            .map_err(|err| LodgeError::network(format!("function invoke: malformed response: {}", err)))
    }
}
