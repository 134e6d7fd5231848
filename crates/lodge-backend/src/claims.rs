//! Access-token claim decoding.
//!
//! The auth service issues JWTs whose payload carries the subject id, the
//! expiry and a handful of identity hints. Decoding them locally lets the
//! session layer learn the subject and expiry without a network round trip;
//! no signature verification happens here — the backend remains the
//! authority, these values only seed local state.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use lodge_core::session::IdentityClaims;
use lodge_core::{LodgeError, Result};
use serde::Deserialize;
use uuid::Uuid;

/// Claims Lodge cares about from the access-token payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Subject: the user id.
    pub sub: Uuid,
    /// Expiry as a Unix timestamp.
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: MetadataClaims,
}

/// Identity hints nested under `user_metadata`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataClaims {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
}

impl TokenClaims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    pub fn identity_claims(&self) -> IdentityClaims {
        IdentityClaims {
            email: self.email.clone(),
            full_name: self.user_metadata.full_name.clone(),
            avatar_url: self.user_metadata.avatar_url.clone(),
            organization: self.user_metadata.organization.clone(),
        }
    }
}

/// Decodes the payload segment of a JWT access token.
pub fn decode(access_token: &str) -> Result<TokenClaims> {
    let payload = access_token
        .split('.')
        .nth(1)
        .ok_or_else(|| LodgeError::auth("Malformed access token"))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|err| LodgeError::auth(format!("Malformed access token payload: {}", err)))?;

    let claims: TokenClaims = serde_json::from_slice(&bytes)?;
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_payload(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"HS256\",\"typ\":\"JWT\"}");
        let body = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        format!("{}.{}.signature", header, body)
    }

    #[test]
    fn test_decode_subject_and_expiry() {
        let user_id = Uuid::new_v4();
        let token = token_with_payload(&serde_json::json!({
            "sub": user_id,
            "exp": 2_000_000_000_i64,
            "email": "jo@example.com",
            "user_metadata": { "full_name": "Jo Lodge" }
        }));

        let claims = decode(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.expires_at().timestamp(), 2_000_000_000);
        assert_eq!(claims.identity_claims().full_name.as_deref(), Some("Jo Lodge"));
    }

    #[test]
    fn test_decode_without_metadata() {
        let token = token_with_payload(&serde_json::json!({
            "sub": Uuid::new_v4(),
            "exp": 2_000_000_000_i64
        }));

        let claims = decode(&token).unwrap();
        assert!(claims.identity_claims().full_name.is_none());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("not-a-jwt").is_err());
        assert!(decode("a.b.c").is_err());
    }
}
