//! Settings resolution for the HyperCLI client.
//!
//! Each setting is resolved once, at client construction, with the
//! precedence: explicit option > environment variable > config file >
//! built-in default. The config file is never re-read per call.

use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use crate::client::ClientOptions;
use crate::error::{HyperError, Result};

use super::file::{config_file_path, load_config};

/// Default production API base URL.
pub const DEFAULT_API_URL: &str = "https://api.hypercli.com";

/// WebSocket path for the job log streaming endpoint.
pub const WS_LOGS_PATH: &str = "/orchestra/ws/logs";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "HYPERCLI_API_KEY";

/// Environment variable overriding the API base URL.
pub const ENV_API_URL: &str = "HYPERCLI_API_URL";

/// Environment variable overriding the WebSocket base URL.
pub const ENV_WS_URL: &str = "HYPERCLI_WS_URL";

/// Registry prefix for first-party service images.
pub const GHCR_IMAGES: &str = "ghcr.io/compute3ai/images";

/// Default ComfyUI service image.
pub const COMFYUI_IMAGE: &str = "ghcr.io/compute3ai/images/comfyui";

/// Immutable, fully resolved client settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Bearer token used for all API requests.
    pub api_key: String,
    /// REST API base URL (no trailing slash).
    pub api_url: String,
    /// WebSocket base URL (no trailing slash).
    pub ws_url: String,
    /// Request timeout applied by the transport.
    pub timeout: Duration,
}

/// Derives the WebSocket base URL from an API URL by scheme substitution.
#[must_use]
pub fn derive_ws_url(api_url: &str) -> String {
    if let Some(rest) = api_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = api_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        api_url.to_string()
    }
}

impl Settings {
    /// Resolves settings from the process environment and the on-disk
    /// config file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no API key can be resolved.
    pub fn resolve(options: &ClientOptions) -> Result<Self> {
        let file = config_file_path()
            .map(|path| load_config(&path))
            .unwrap_or_default();

        Self::resolve_from(options, &|name| std::env::var(name).ok(), &file)
    }

    /// Resolves settings from an injected environment lookup and config map.
    ///
    /// The indirection exists so resolution order is testable without
    /// touching process-global state.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no API key can be resolved.
    pub fn resolve_from(
        options: &ClientOptions,
        env: &dyn Fn(&str) -> Option<String>,
        file: &BTreeMap<String, String>,
    ) -> Result<Self> {
        let lookup = |name: &str| -> Option<String> {
            env(name)
                .filter(|v| !v.is_empty())
                .or_else(|| file.get(name).filter(|v| !v.is_empty()).cloned())
        };

        let api_key = options
            .api_key
            .clone()
            .or_else(|| lookup(ENV_API_KEY))
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                HyperError::config(format!(
                    "API key required. Set the {ENV_API_KEY} environment variable, \
                     create ~/{}/{}, or pass an explicit key.",
                    super::file::CONFIG_DIR_NAME,
                    super::file::CONFIG_FILE_NAME,
                ))
            })?;

        let api_url = options
            .api_url
            .clone()
            .or_else(|| lookup(ENV_API_URL))
            .unwrap_or_else(|| String::from(DEFAULT_API_URL));
        let api_url = api_url.trim_end_matches('/').to_string();

        let ws_url = options
            .ws_url
            .clone()
            .or_else(|| lookup(ENV_WS_URL))
            .unwrap_or_else(|| derive_ws_url(&api_url));
        let ws_url = ws_url.trim_end_matches('/').to_string();

        let timeout = options.timeout.unwrap_or(DEFAULT_TIMEOUT);

        debug!("Resolved settings: api_url={api_url}, ws_url={ws_url}");

        Ok(Self {
            api_key,
            api_url,
            ws_url,
            timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_env_var_wins_over_config_file() {
        let mut file = BTreeMap::new();
        file.insert(String::from(ENV_API_KEY), String::from("hyper_api_file"));

        let env = |name: &str| {
            (name == ENV_API_KEY).then(|| String::from("hyper_api_env"))
        };

        let settings =
            Settings::resolve_from(&ClientOptions::default(), &env, &file).unwrap();
        assert_eq!(settings.api_key, "hyper_api_env");
    }

    #[test]
    fn test_explicit_option_wins_over_env() {
        let env = |name: &str| {
            (name == ENV_API_KEY).then(|| String::from("hyper_api_env"))
        };

        let options = ClientOptions::default().with_api_key("hyper_api_explicit");
        let settings = Settings::resolve_from(&options, &env, &BTreeMap::new()).unwrap();
        assert_eq!(settings.api_key, "hyper_api_explicit");
    }

    #[test]
    fn test_missing_api_key_is_descriptive_error() {
        let result =
            Settings::resolve_from(&ClientOptions::default(), &no_env, &BTreeMap::new());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("API key required"));
    }

    #[test]
    fn test_default_api_url_and_derived_ws_url() {
        let options = ClientOptions::default().with_api_key("k");
        let settings =
            Settings::resolve_from(&options, &no_env, &BTreeMap::new()).unwrap();
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.ws_url, "wss://api.hypercli.com");
        assert_eq!(settings.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_ws_url_scheme_substitution() {
        assert_eq!(derive_ws_url("http://localhost:8080"), "ws://localhost:8080");
        assert_eq!(derive_ws_url("https://api.example.com"), "wss://api.example.com");
    }

    #[test]
    fn test_api_url_trailing_slash_trimmed() {
        let options = ClientOptions::default()
            .with_api_key("k")
            .with_api_url("https://api.example.com/");
        let settings =
            Settings::resolve_from(&options, &no_env, &BTreeMap::new()).unwrap();
        assert_eq!(settings.api_url, "https://api.example.com");
    }
}
