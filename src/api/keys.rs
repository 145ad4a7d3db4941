//! API key management.
//!
//! The full key secret is a write-once value: it appears only in the
//! response to [`KeysApi::create`] and can never be retrieved again. List
//! and get responses carry a masked preview instead.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::transport::Transport;

/// An API key record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    /// Key identifier.
    #[serde(default)]
    pub key_id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Full plaintext secret; present only in the creation response.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Masked preview of the secret.
    #[serde(default)]
    pub api_key_preview: Option<String>,
    /// Last four characters of the secret.
    #[serde(default)]
    pub last4: Option<String>,
    /// Whether the key is active.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Creation timestamp (ISO-8601 string).
    #[serde(default)]
    pub created_at: String,
    /// Last usage timestamp, if ever used.
    #[serde(default)]
    pub last_used_at: Option<String>,
}

const fn default_true() -> bool {
    true
}

/// API keys namespace.
#[derive(Debug, Clone, Copy)]
pub struct KeysApi<'a> {
    http: &'a Transport,
}

impl<'a> KeysApi<'a> {
    pub(crate) const fn new(http: &'a Transport) -> Self {
        Self { http }
    }

    /// Creates a new API key.
    ///
    /// The returned record holds the only copy of the plaintext secret;
    /// store it immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn create(&self, name: &str) -> Result<ApiKey> {
        info!("Creating API key: {name}");
        self.http
            .post("/api/keys", &serde_json::json!({ "name": name }))
            .await
    }

    /// Lists all API keys (secrets masked).
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn list(&self) -> Result<Vec<ApiKey>> {
        self.http.get("/api/keys", &[]).await
    }

    /// Fetches a single API key (secret masked).
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the identifier is unknown.
    pub async fn get(&self, key_id: &str) -> Result<ApiKey> {
        self.http.get(&format!("/api/keys/{key_id}"), &[]).await
    }

    /// Deactivates an API key. This is irreversible: a disabled key cannot
    /// be re-enabled, only replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn disable(&self, key_id: &str) -> Result<serde_json::Value> {
        info!("Disabling API key: {key_id}");
        self.http.delete(&format!("/api/keys/{key_id}")).await
    }

    /// Renames an API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn rename(&self, key_id: &str, name: &str) -> Result<ApiKey> {
        self.http
            .patch(
                &format!("/api/keys/{key_id}"),
                &serde_json::json!({ "name": name }),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_masked_key_has_no_secret() {
        let key: ApiKey = serde_json::from_value(json!({
            "key_id": "k1",
            "name": "ci",
            "api_key_preview": "hyper_api_****abcd",
            "last4": "abcd"
        }))
        .unwrap();
        assert!(key.api_key.is_none());
        assert_eq!(key.api_key_preview.as_deref(), Some("hyper_api_****abcd"));
        assert!(key.is_active);
    }

    #[tokio::test]
    async fn test_create_returns_full_secret_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/keys"))
            .and(body_partial_json(json!({"name": "deploy"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "key_id": "k1",
                "name": "deploy",
                "api_key": "hyper_api_plaintext"
            })))
            .mount(&server)
            .await;

        let transport =
            Transport::new(&server.uri(), "k", std::time::Duration::from_secs(5)).unwrap();
        let keys = KeysApi::new(&transport);
        let created = keys.create("deploy").await.unwrap();
        assert_eq!(created.api_key.as_deref(), Some("hyper_api_plaintext"));
    }
}
