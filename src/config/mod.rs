//! Configuration module for the HyperCLI client.
//!
//! This module handles all configuration-related functionality:
//! - Reading and writing the `~/.hypercli/config` file (key=value lines)
//! - Resolving settings with the precedence: explicit option > environment
//!   variable > config file > built-in default
//! - Deriving the WebSocket URL from the API URL

mod file;
mod settings;

pub use file::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, config_file_path, configure};
pub use settings::{
    COMFYUI_IMAGE, DEFAULT_API_URL, DEFAULT_TIMEOUT, ENV_API_KEY, ENV_API_URL, ENV_WS_URL,
    GHCR_IMAGES, Settings, WS_LOGS_PATH, derive_ws_url,
};
