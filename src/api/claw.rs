//! HyperClaw API: the inference-subscription subsystem.
//!
//! Claw endpoints live on a distinct base URL from the main API and accept
//! either the dedicated Claw key or the main API key. Chat completions are
//! out of scope: point any OpenAI-compatible client at [`Claw::base_url`].

use chrono::{DateTime, Utc};
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{HyperError, Result};
use crate::transport::handle_response;

/// Production Claw API base URL.
pub const CLAW_API_BASE: &str = "https://api.hyperclaw.app/v1";

/// Development Claw API base URL.
pub const CLAW_DEV_API_BASE: &str = "https://dev-api.hyperclaw.app/v1";

/// Subscription key status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClawKey {
    /// The key itself.
    #[serde(default)]
    pub key: String,
    /// Subscribed plan identifier.
    #[serde(default)]
    pub plan_id: String,
    /// Expiry timestamp.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Tokens-per-minute limit.
    #[serde(default)]
    pub tpm_limit: u64,
    /// Requests-per-minute limit.
    #[serde(default)]
    pub rpm_limit: u64,
    /// Owning user, if linked.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// A subscription plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClawPlan {
    /// Plan identifier.
    #[serde(default)]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Monthly price in USD.
    #[serde(default)]
    pub price_usd: f64,
    /// Tokens-per-minute limit.
    #[serde(default)]
    pub tpm_limit: u64,
    /// Requests-per-minute limit.
    #[serde(default)]
    pub rpm_limit: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ClawModelCapabilities {
    #[serde(default)]
    supports_vision: bool,
    #[serde(default)]
    supports_function_calling: bool,
    #[serde(default)]
    supports_tool_choice: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ClawModelWire {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    context_length: u64,
    #[serde(default)]
    capabilities: ClawModelCapabilities,
}

/// An available inference model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClawModel {
    /// Model identifier.
    pub id: String,
    /// Display name (the identifier when none is published).
    pub name: String,
    /// Context window size in tokens.
    pub context_length: u64,
    /// Whether the model accepts image input.
    pub supports_vision: bool,
    /// Whether the model supports function calling.
    pub supports_function_calling: bool,
    /// Whether the model supports forced tool choice.
    pub supports_tool_choice: bool,
}

impl From<ClawModelWire> for ClawModel {
    fn from(wire: ClawModelWire) -> Self {
        let name = wire.name.unwrap_or_else(|| wire.id.clone());
        Self {
            id: wire.id,
            name,
            context_length: wire.context_length,
            supports_vision: wire.capabilities.supports_vision,
            supports_function_calling: wire.capabilities.supports_function_calling,
            supports_tool_choice: wire.capabilities.supports_tool_choice,
        }
    }
}

/// Discovery service health summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryHealth {
    /// Total known hosts.
    #[serde(default)]
    pub hosts_total: u64,
    /// Hosts currently passing health checks.
    #[serde(default)]
    pub hosts_healthy: u64,
    /// Fallback routes currently in effect.
    #[serde(default)]
    pub fallbacks_active: u64,
}

#[derive(Deserialize)]
struct PlanListResponse {
    #[serde(default)]
    plans: Vec<ClawPlan>,
}

#[derive(Deserialize)]
struct ModelListResponse {
    #[serde(default)]
    data: Vec<ClawModelWire>,
}

/// HyperClaw API client.
#[derive(Debug, Clone)]
pub struct Claw {
    /// HTTP client.
    http: Client,
    /// Base URL including the `/v1` suffix.
    base_url: String,
    /// Key used for bearer authentication.
    api_key: String,
}

impl Claw {
    /// Creates a Claw client.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the HTTP client cannot be created.
    pub(crate) fn new(api_key: &str, dev: bool, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HyperError::transport(format!("Failed to create HTTP client: {e}")))?;

        let base_url = if dev { CLAW_DEV_API_BASE } else { CLAW_API_BASE };

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Returns the OpenAI-compatible base URL of this client.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the key this client authenticates with.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    fn base_without_v1(&self) -> &str {
        self.base_url.strip_suffix("/v1").unwrap_or(&self.base_url)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    /// Returns the current key status and subscription details.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn key_status(&self) -> Result<ClawKey> {
        let url = format!("{}/api/keys/status", self.base_without_v1());
        let response = self
            .http
            .get(url)
            .header(header::AUTHORIZATION, self.bearer())
            .send()
            .await
            .map_err(|e| HyperError::transport(format!("Request failed: {e}")))?;
        handle_response(response).await
    }

    /// Lists the available subscription plans.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn plans(&self) -> Result<Vec<ClawPlan>> {
        let url = format!("{}/api/plans", self.base_without_v1());
        let response = self
            .http
            .get(url)
            .header(header::AUTHORIZATION, self.bearer())
            .send()
            .await
            .map_err(|e| HyperError::transport(format!("Request failed: {e}")))?;
        let listed: PlanListResponse = handle_response(response).await?;
        Ok(listed.plans)
    }

    /// Lists the available models with their capability flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn models(&self) -> Result<Vec<ClawModel>> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .http
            .get(url)
            .header(header::AUTHORIZATION, self.bearer())
            .send()
            .await
            .map_err(|e| HyperError::transport(format!("Request failed: {e}")))?;
        let listed: ModelListResponse = handle_response(response).await?;
        Ok(listed.data.into_iter().map(ClawModel::from).collect())
    }

    /// Returns the discovery service health summary. No authentication.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn discovery_health(&self) -> Result<DiscoveryHealth> {
        let url = format!("{}/discovery/health", self.base_without_v1());
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| HyperError::transport(format!("Request failed: {e}")))?;
        handle_response(response).await
    }

    /// Returns the discovery service configuration. The key, when given, is
    /// sent in the `X-API-KEY` header as the endpoint expects.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn discovery_config(&self, api_key: Option<&str>) -> Result<serde_json::Value> {
        let url = format!("{}/discovery/config", self.base_without_v1());
        let mut request = self.http.get(url);
        if let Some(key) = api_key {
            request = request.header("X-API-KEY", key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| HyperError::transport(format!("Request failed: {e}")))?;
        handle_response(response).await
    }
}
