//! Configuration for the keyboard adapter
//!
//! Stored as TOML. Every field has a default, so a partial file (or no file
//! at all) is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use keystation_transport::{EventReaderConfig, OpenOptions, PRODUCT_ID, VENDOR_ID};
use serde::{Deserialize, Serialize};

use crate::error::KeystationError;

fn default_vendor_id() -> u16 {
    VENDOR_ID
}
fn default_product_id() -> u16 {
    PRODUCT_ID
}
fn default_read_timeout_ms() -> u64 {
    100
}
fn default_error_sleep_ms() -> u64 {
    100
}
fn default_true() -> bool {
    true
}

/// Adapter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystationConfig {
    /// USB vendor ID of the keyboard
    #[serde(default = "default_vendor_id")]
    pub vendor_id: u16,
    /// USB product ID of the keyboard
    #[serde(default = "default_product_id")]
    pub product_id: u16,
    /// How long one read blocks before re-checking for shutdown
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Pause after a transport error before reading again
    #[serde(default = "default_error_sleep_ms")]
    pub error_sleep_ms: u64,
    /// Detach the kernel's audio driver from the MIDI interface
    #[serde(default = "default_true")]
    pub detach_kernel_driver: bool,
}

impl Default for KeystationConfig {
    fn default() -> Self {
        Self {
            vendor_id: default_vendor_id(),
            product_id: default_product_id(),
            read_timeout_ms: default_read_timeout_ms(),
            error_sleep_ms: default_error_sleep_ms(),
            detach_kernel_driver: default_true(),
        }
    }
}

impl KeystationConfig {
    /// Default config for a specific device identity
    pub fn with_ids(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            ..Self::default()
        }
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keystation")
            .join("keystation.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> Result<Self, KeystationError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| KeystationError::Config(format!("{}: {e}", path.display())))?;
        Self::parse(&content)
    }

    /// Parse config from TOML text
    pub fn parse(content: &str) -> Result<Self, KeystationError> {
        toml::from_str(content).map_err(|e| KeystationError::Config(e.to_string()))
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> Result<(), KeystationError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| KeystationError::Config(format!("{}: {e}", parent.display())))?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| KeystationError::Config(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| KeystationError::Config(format!("{}: {e}", path.display())))
    }

    pub(crate) fn reader_config(&self) -> EventReaderConfig {
        EventReaderConfig {
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            error_sleep: Duration::from_millis(self.error_sleep_ms),
            name: "Keystation",
        }
    }

    pub(crate) fn open_options(&self) -> OpenOptions {
        OpenOptions {
            detach_kernel_driver: self.detach_kernel_driver,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_keystation32() {
        let config = KeystationConfig::default();
        assert_eq!(config.vendor_id, 0x0A4D);
        assert_eq!(config.product_id, 0x129D);
        assert!(config.detach_kernel_driver);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = KeystationConfig::parse("product_id = 0x1234\nread_timeout_ms = 20\n").unwrap();
        assert_eq!(config.vendor_id, VENDOR_ID);
        assert_eq!(config.product_id, 0x1234);
        assert_eq!(config.read_timeout_ms, 20);
        assert_eq!(config.error_sleep_ms, 100);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(KeystationConfig::parse("").unwrap(), KeystationConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = KeystationConfig::parse("vendor_id = \"not a number\"");
        assert!(matches!(result, Err(KeystationError::Config(_))));
    }

    #[test]
    fn test_missing_file_loads_default() {
        let path = std::env::temp_dir().join("keystation-test-does-not-exist.toml");
        let config = KeystationConfig::load(&path).unwrap();
        assert_eq!(config, KeystationConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = std::env::temp_dir().join(format!("keystation-config-{}", std::process::id()));
        let path = dir.join("nested").join("keystation.toml");
        let config = KeystationConfig {
            detach_kernel_driver: false,
            ..KeystationConfig::with_ids(0x0A4D, 0x1111)
        };

        config.save(&path).unwrap();
        let loaded = KeystationConfig::load(&path).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_dir_all(&dir).ok();
    }
}
