//! HTTP implementation of the authentication gateway.
//!
//! Talks to the hosted auth service's REST endpoints
//! (`/auth/v1/token`, `/auth/v1/logout`, `/auth/v1/user`, `/auth/v1/recover`).
//! Authentication failures carry the backend's message so the login form
//! can surface it verbatim; transport failures map to network/timeout
//! errors and are never retried here.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use lodge_core::session::{AuthGateway, Credentials, IdentityClaims, Session};
use lodge_core::{LodgeError, Result};
use lodge_infrastructure::BackendConfig;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::claims::{self, MetadataClaims};
use crate::http::{map_send_error, REQUEST_TIMEOUT_SECS};

/// Auth gateway over the hosted auth REST API.
#[derive(Clone)]
pub struct HttpAuthGateway {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl HttpAuthGateway {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    fn request(&self, builder: reqwest::RequestBuilder, bearer: &str) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.anon_key)
            .header("authorization", format!("Bearer {}", bearer))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    async fn token_request(&self, operation: &str, grant_type: &str, body: &impl Serialize) -> Result<Session> {
        let url = format!("{}?grant_type={}", self.endpoint("/token"), grant_type);
        let response = self
            .request(self.client.post(&url).json(body), &self.anon_key)
            .send()
            .await
            .map_err(|err| map_send_error(operation, err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response.text().await.unwrap_or_default();
            return Err(map_auth_status(operation, status, &body_text));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|err| LodgeError::network(format!("{}: malformed response: {}", operation, err)))?;

        session_from_token_response(parsed)
    }
}

#[async_trait]
impl AuthGateway for HttpAuthGateway {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session> {
        let body = PasswordGrant {
            email: &credentials.email,
            password: &credentials.password,
        };
        self.token_request("sign-in", "password", &body).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .request(self.client.post(self.endpoint("/logout")), access_token)
            .send()
            .await
            .map_err(|err| map_send_error("sign-out", err))?;

        // 401 on logout means the token was already dead; local state is
        // cleared by the caller either way.
        if response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED {
            Ok(())
        } else {
            Err(LodgeError::network(format!(
                "sign-out failed with status {}",
                response.status().as_u16()
            )))
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        let body = RefreshGrant { refresh_token };
        self.token_request("session refresh", "refresh_token", &body)
            .await
    }

    async fn update_password(&self, access_token: &str, new_password: &str) -> Result<()> {
        let body = UpdateUser {
            password: new_password,
        };
        let response = self
            .request(self.client.put(self.endpoint("/user")).json(&body), access_token)
            .send()
            .await
            .map_err(|err| map_send_error("password update", err))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body_text = response.text().await.unwrap_or_default();
            Err(map_auth_status("password update", status, &body_text))
        }
    }

    async fn request_password_recovery(&self, email: &str) -> Result<()> {
        let body = RecoverRequest { email };
        let response = self
            .request(self.client.post(self.endpoint("/recover")).json(&body), &self.anon_key)
            .send()
            .await
            .map_err(|err| map_send_error("password recovery", err))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body_text = response.text().await.unwrap_or_default();
            Err(map_auth_status("password recovery", status, &body_text))
        }
    }
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct UpdateUser<'a> {
    password: &'a str,
}

#[derive(Serialize)]
struct RecoverRequest<'a> {
    email: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<ApiUser>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<MetadataClaims>,
}

/// Builds a `Session` from a token grant, falling back to the token's own
/// claims when the response omits the user object (refresh grants do).
fn session_from_token_response(response: TokenResponse) -> Result<Session> {
    let token_claims = claims::decode(&response.access_token).ok();

    let user_id = response
        .user
        .as_ref()
        .map(|user| user.id)
        .or_else(|| token_claims.as_ref().map(|claims| claims.sub))
        .ok_or_else(|| LodgeError::auth("Token response carried no subject"))?;

    let expires_at = response
        .expires_in
        .map(|seconds| Utc::now() + chrono::Duration::seconds(seconds))
        .or_else(|| token_claims.as_ref().map(|claims| claims.expires_at()))
        .unwrap_or_else(|| Utc::now() + chrono::Duration::hours(1));

    let identity = match &response.user {
        Some(user) => {
            let metadata = user.user_metadata.clone().unwrap_or_default();
            IdentityClaims {
                email: user.email.clone(),
                full_name: metadata.full_name,
                avatar_url: metadata.avatar_url,
                organization: metadata.organization,
            }
        }
        None => token_claims
            .as_ref()
            .map(|claims| claims.identity_claims())
            .unwrap_or_default(),
    };

    Ok(Session {
        user_id,
        access_token: response.access_token,
        refresh_token: response.refresh_token,
        expires_at,
        claims: identity,
    })
}

/// Maps an auth-endpoint error status to a user-facing `LodgeError`.
fn map_auth_status(operation: &str, status: StatusCode, body: &str) -> LodgeError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            LodgeError::auth("Too many attempts. Please try again shortly.")
        }
        StatusCode::BAD_REQUEST
        | StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN
        | StatusCode::UNPROCESSABLE_ENTITY => {
            LodgeError::auth(auth_error_message(body).unwrap_or_else(|| {
                "Sign-in failed. Check your email and password.".to_string()
            }))
        }
        _ => LodgeError::network(format!(
            "{} failed with status {}",
            operation,
            status.as_u16()
        )),
    }
}

/// Extracts the human-readable message from an auth error body.
fn auth_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    for key in ["error_description", "msg", "message", "error"] {
        if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
            if !message.is_empty() {
                return Some(message.to_string());
            }
        }
    }
    None
}
