//! Serverless function invocation trait.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Ancillary serverless calls (e.g. "does this email already have an
/// account").
///
/// Results are advisory: on error the caller defaults to the more
/// permissive branch rather than blocking the user.
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    async fn invoke(&self, name: &str, payload: Value) -> Result<Value>;
}
