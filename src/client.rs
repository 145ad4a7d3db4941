//! The root HyperCLI client.
//!
//! Construction resolves configuration exactly once (explicit option >
//! environment variable > config file > default) and builds the shared
//! transport. All API namespaces borrow the same transport; the client is
//! cheap to clone and safe to share across tasks.

use std::time::Duration;

use crate::api::{Billing, Claw, FilesApi, Instances, Jobs, KeysApi, RendersApi, UserApi};
use crate::config::Settings;
use crate::error::Result;
use crate::transport::Transport;

/// Options for constructing a [`HyperClient`].
///
/// Every field is optional; anything unset falls back to the environment,
/// the config file, and finally the built-in default.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Explicit API key.
    pub api_key: Option<String>,
    /// Explicit API base URL.
    pub api_url: Option<String>,
    /// Explicit WebSocket base URL.
    pub ws_url: Option<String>,
    /// Dedicated Claw key (defaults to the main API key).
    pub claw_api_key: Option<String>,
    /// Target the Claw development environment.
    pub claw_dev: bool,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

impl ClientOptions {
    /// Sets an explicit API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    /// Sets an explicit API base URL.
    #[must_use]
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = Some(api_url.to_string());
        self
    }

    /// Sets an explicit WebSocket base URL.
    #[must_use]
    pub fn with_ws_url(mut self, ws_url: &str) -> Self {
        self.ws_url = Some(ws_url.to_string());
        self
    }

    /// Sets a dedicated Claw API key.
    #[must_use]
    pub fn with_claw_api_key(mut self, key: &str) -> Self {
        self.claw_api_key = Some(key.to_string());
        self
    }

    /// Targets the Claw development environment.
    #[must_use]
    pub const fn with_claw_dev(mut self, dev: bool) -> Self {
        self.claw_dev = dev;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// HyperCLI API client.
///
/// # Example
///
/// ```no_run
/// use hypercli::{ClientOptions, CreateJobRequest, HyperClient};
///
/// # async fn run() -> hypercli::Result<()> {
/// let client = HyperClient::with_options(ClientOptions::default().with_api_key("hyper_api_..."))?;
///
/// let balance = client.billing().balance().await?;
/// println!("Balance: ${}", balance.total);
///
/// let job = client
///     .jobs()
///     .create(&CreateJobRequest::new("nvidia/cuda:12.0").with_runtime(3600))
///     .await?;
/// println!("Job {} is {}", job.job_id, job.state);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HyperClient {
    /// Shared HTTP transport.
    transport: Transport,
    /// Resolved immutable settings.
    settings: Settings,
    /// Dedicated Claw key, if configured.
    claw_api_key: Option<String>,
    /// Whether Claw targets the development environment.
    claw_dev: bool,
}

impl HyperClient {
    /// Creates a client from the environment and config file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no API key can be resolved, or a
    /// transport error if the HTTP client cannot be created.
    pub fn new() -> Result<Self> {
        Self::with_options(ClientOptions::default())
    }

    /// Creates a client with explicit options.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no API key can be resolved, or a
    /// transport error if the HTTP client cannot be created.
    pub fn with_options(options: ClientOptions) -> Result<Self> {
        let settings = Settings::resolve(&options)?;
        Self::from_settings(settings, options.claw_api_key, options.claw_dev)
    }

    /// Creates a client from already-resolved settings.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the HTTP client cannot be created.
    pub fn from_settings(
        settings: Settings,
        claw_api_key: Option<String>,
        claw_dev: bool,
    ) -> Result<Self> {
        let transport = Transport::new(&settings.api_url, &settings.api_key, settings.timeout)?;

        Ok(Self {
            transport,
            settings,
            claw_api_key,
            claw_dev,
        })
    }

    /// Returns the resolved API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.settings.api_key
    }

    /// Returns the resolved API base URL.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.settings.api_url
    }

    /// Returns the resolved WebSocket base URL.
    #[must_use]
    pub fn ws_url(&self) -> &str {
        &self.settings.ws_url
    }

    /// Returns the shared transport.
    #[must_use]
    pub const fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Billing namespace.
    #[must_use]
    pub const fn billing(&self) -> Billing<'_> {
        Billing::new(&self.transport)
    }

    /// Jobs namespace.
    #[must_use]
    pub const fn jobs(&self) -> Jobs<'_> {
        Jobs::new(&self.transport)
    }

    /// User namespace.
    #[must_use]
    pub const fn user(&self) -> UserApi<'_> {
        UserApi::new(&self.transport)
    }

    /// Instances namespace.
    #[must_use]
    pub const fn instances(&self) -> Instances<'_> {
        Instances::new(&self.transport)
    }

    /// Files namespace.
    #[must_use]
    pub const fn files(&self) -> FilesApi<'_> {
        FilesApi::new(&self.transport)
    }

    /// API keys namespace.
    #[must_use]
    pub const fn keys(&self) -> KeysApi<'_> {
        KeysApi::new(&self.transport)
    }

    /// Renders namespace.
    #[must_use]
    pub const fn renders(&self) -> RendersApi<'_> {
        RendersApi::new(&self.transport)
    }

    /// Claw client for the inference-subscription API.
    ///
    /// Uses the dedicated Claw key when configured, else the main API key.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the HTTP client cannot be created.
    pub fn claw(&self) -> Result<Claw> {
        let key = self
            .claw_api_key
            .as_deref()
            .unwrap_or(&self.settings.api_key);
        Claw::new(key, self.claw_dev, self.settings.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(api_url: &str) -> HyperClient {
        let settings = Settings {
            api_key: String::from("hyper_api_test"),
            api_url: api_url.trim_end_matches('/').to_string(),
            ws_url: crate::config::derive_ws_url(api_url),
            timeout: Duration::from_secs(5),
        };
        HyperClient::from_settings(settings, None, false).unwrap()
    }

    #[test]
    fn test_namespaces_share_transport() {
        let client = test_client("http://localhost:9");
        assert_eq!(client.transport().base_url(), "http://localhost:9");
        assert_eq!(client.api_key(), "hyper_api_test");
        assert_eq!(client.ws_url(), "ws://localhost:9");
    }

    #[test]
    fn test_claw_defaults_to_main_key() {
        let client = test_client("http://localhost:9");
        let claw = client.claw().unwrap();
        assert_eq!(claw.api_key(), "hyper_api_test");
        assert_eq!(claw.base_url(), crate::api::CLAW_API_BASE);
    }

    #[test]
    fn test_options_builder() {
        let options = ClientOptions::default()
            .with_api_key("k")
            .with_api_url("http://localhost:1234")
            .with_claw_dev(true)
            .with_timeout(Duration::from_secs(10));
        assert_eq!(options.api_key.as_deref(), Some("k"));
        assert!(options.claw_dev);
        assert_eq!(options.timeout, Some(Duration::from_secs(10)));
    }
}
