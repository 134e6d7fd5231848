//! Ancillary sign-in checks backed by serverless functions.

use lodge_core::functions::FunctionInvoker;

/// Asks the backend whether an email address already has an account, so
/// the login form can route between sign-in and sign-up.
///
/// The answer is advisory: on any error the permissive branch wins and the
/// user proceeds to password entry rather than being blocked by an
/// ancillary check.
pub async fn email_has_account(invoker: &dyn FunctionInvoker, email: &str) -> bool {
    let payload = serde_json::json!({ "email": email });

    match invoker.invoke("check-email-exists", payload).await {
        Ok(value) => value
            .get("exists")
            .and_then(|exists| exists.as_bool())
            .unwrap_or(true),
        Err(err) => {
            tracing::warn!("[AccountCheck] Lookup failed ({}), assuming account exists", err);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use lodge_core::LodgeError;
    use serde_json::Value;

    use super::*;

    struct ScriptedInvoker {
        response: lodge_core::Result<Value>,
    }

    #[async_trait]
    impl FunctionInvoker for ScriptedInvoker {
        async fn invoke(&self, _name: &str, _payload: Value) -> lodge_core::Result<Value> {
            self.response.clone()
        }
    }

    #[tokio::test]
    async fn test_known_email_reports_account() {
        let invoker = ScriptedInvoker {
            response: Ok(serde_json::json!({ "exists": true })),
        };
        assert!(email_has_account(&invoker, "jo@example.com").await);
    }

    #[tokio::test]
    async fn test_unknown_email_reports_no_account() {
        let invoker = ScriptedInvoker {
            response: Ok(serde_json::json!({ "exists": false })),
        };
        assert!(!email_has_account(&invoker, "new@example.com").await);
    }

    #[tokio::test]
    async fn test_failure_defaults_to_permissive_branch() {
        let invoker = ScriptedInvoker {
            response: Err(LodgeError::network("functions unreachable")),
        };
        assert!(email_has_account(&invoker, "jo@example.com").await);
    }

    #[tokio::test]
    async fn test_malformed_response_defaults_to_permissive_branch() {
        let invoker = ScriptedInvoker {
            response: Ok(serde_json::json!({ "unexpected": 1 })),
        };
        assert!(email_has_account(&invoker, "jo@example.com").await);
    }
}
