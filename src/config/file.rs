//! Config file handling for `~/.hypercli/config`.
//!
//! The file format is one `KEY=value` pair per line. Blank lines and lines
//! starting with `#` are ignored. Values may contain `=`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{HyperError, Result};

/// Directory under the home directory that holds the config file.
pub const CONFIG_DIR_NAME: &str = ".hypercli";

/// Name of the config file inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config";

/// Returns the path of the config file, if a home directory is known.
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Parses config file content into a key/value map.
pub(crate) fn parse_config(content: &str) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = trimmed.split_once('=') {
            values.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    values
}

/// Loads the config file at `path`, returning an empty map if the file is
/// missing or unreadable.
pub(crate) fn load_config(path: &Path) -> BTreeMap<String, String> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
        Err(e) => {
            warn!("Failed to read config file {}: {e}", path.display());
            BTreeMap::new()
        }
    }
}

/// Writes the key/value map to `path`, creating parent directories.
///
/// On Unix the file is created with owner-only permissions (0600) because it
/// holds the API key.
pub(crate) fn write_config(path: &Path, values: &BTreeMap<String, String>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut content = String::new();
    for (key, value) in values {
        content.push_str(key);
        content.push('=');
        content.push_str(value);
        content.push('\n');
    }

    std::fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)?;
    }

    debug!("Wrote config file: {}", path.display());
    Ok(())
}

/// Saves the API key (and optionally the API URL) to `~/.hypercli/config`,
/// merging with any existing entries.
///
/// # Errors
///
/// Returns an error if no home directory can be determined or the file
/// cannot be written.
pub fn configure(api_key: &str, api_url: Option<&str>) -> Result<()> {
    let path = config_file_path()
        .ok_or_else(|| HyperError::config("Cannot determine home directory"))?;

    let mut values = load_config(&path);
    values.insert(
        String::from(super::settings::ENV_API_KEY),
        api_key.to_string(),
    );
    if let Some(url) = api_url {
        values.insert(String::from(super::settings::ENV_API_URL), url.to_string());
    }

    write_config(&path, &values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value_lines() {
        let content = "\
# comment line
HYPERCLI_API_KEY=hyper_api_abc123

HYPERCLI_API_URL = https://staging.hypercli.com
BAD LINE WITHOUT EQUALS
TOKEN=a=b=c
";
        let values = parse_config(content);
        assert_eq!(
            values.get("HYPERCLI_API_KEY").map(String::as_str),
            Some("hyper_api_abc123")
        );
        assert_eq!(
            values.get("HYPERCLI_API_URL").map(String::as_str),
            Some("https://staging.hypercli.com")
        );
        assert_eq!(values.get("TOKEN").map(String::as_str), Some("a=b=c"));
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let values = load_config(&dir.path().join("does-not-exist"));
        assert!(values.is_empty());
    }

    #[test]
    fn test_write_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);

        let mut values = BTreeMap::new();
        values.insert(String::from("HYPERCLI_API_KEY"), String::from("hyper_api_k1"));
        values.insert(
            String::from("HYPERCLI_API_URL"),
            String::from("http://localhost:8080"),
        );
        write_config(&path, &values).unwrap();

        let reloaded = load_config(&path);
        assert_eq!(reloaded, values);
    }

    #[cfg(unix)]
    #[test]
    fn test_written_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");

        let mut values = BTreeMap::new();
        values.insert(String::from("HYPERCLI_API_KEY"), String::from("secret"));
        write_config(&path, &values).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
