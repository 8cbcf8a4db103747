//! Engine configuration via `nearseek.toml`
//!
//! On first open, a default `nearseek.toml` is created in the data
//! directory. To change settings, edit the file and reopen.

use serde::{Deserialize, Serialize};
use std::path::Path;

use nearseek_core::{Error, Result};

use crate::cursor::CursorConfig;

/// Config file name placed in the database data directory.
pub const CONFIG_FILE_NAME: &str = "nearseek.toml";

/// Engine configuration loaded from `nearseek.toml`.
///
/// # Example
///
/// ```toml
/// # Evict to a reconciled page once this many keys are resident
/// max_resident_keys = 4096
///
/// [cursor]
/// prefix_key = false
/// key_format = "raw"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Automatic eviction threshold. `None` disables automatic eviction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_resident_keys: Option<usize>,
    /// Defaults for cursors opened with `Database::open_cursor`.
    #[serde(default)]
    pub cursor: CursorConfig,
}

impl EngineConfig {
    /// Check values serde cannot.
    ///
    /// # Errors
    ///
    /// Returns `Config` if `max_resident_keys` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_resident_keys == Some(0) {
            return Err(Error::Config(
                "max_resident_keys must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# nearseek configuration
#
# Evict resident keys to a reconciled page once more than this many keys
# are resident. Leave unset to evict only on request.
# max_resident_keys = 4096

[cursor]
# Restrict search_near results to keys prefixed by the search key.
# Can be changed on an open cursor with reconfigure("prefix_key=true").
prefix_key = false

# Key encoding: "raw", "string" or "fixed:N" (NUL-padded to N bytes)
key_format = "raw"
"#
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the text cannot be parsed or fails validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            Error::Config(msg) => {
                Error::Config(format!("Config file '{}': {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
