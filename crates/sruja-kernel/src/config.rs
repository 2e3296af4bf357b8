//! Kernel configuration
//!
//! Loaded from a TOML document; every key is optional and falls back to a
//! default, so an empty document yields `KernelConfig::default()`.
//!
//! ```toml
//! [cache]
//! enabled = true
//! max_entries = 256
//!
//! [history]
//! max_records_per_cell = 0   # 0 keeps every record until reset
//!
//! [diagram]
//! default_format = "mermaid"
//!
//! [logging]
//! profile = "development"
//!
//! [ir]
//! default_architecture_name = "Architecture"
//! ```

use serde::Deserialize;
use sruja_core::logging_facility::Profile;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {message}")]
    Read { path: String, message: String },

    #[error("invalid kernel config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Root configuration of a kernel instance
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct KernelConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub diagram: DiagramConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub ir: IrConfig,
}

/// Result cache for diagram, query and validation cells
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Entries kept before the oldest is evicted
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_max_entries() -> usize {
    256
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            max_entries: default_cache_max_entries(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HistoryConfig {
    /// Execution records retained per cell, oldest dropped first; 0 keeps all
    #[serde(default = "default_max_records_per_cell")]
    pub max_records_per_cell: usize,
}

fn default_max_records_per_cell() -> usize {
    0
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_records_per_cell: default_max_records_per_cell(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DiagramConfig {
    /// Format used when a `diagram` command names none
    #[serde(default = "default_diagram_format")]
    pub default_format: String,
}

fn default_diagram_format() -> String {
    "mermaid".to_string()
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            default_format: default_diagram_format(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub profile: Profile,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct IrConfig {
    /// Architecture name of a fresh or reset store
    #[serde(default = "default_architecture_name")]
    pub default_architecture_name: String,
}

fn default_architecture_name() -> String {
    "Architecture".to_string()
}

impl Default for IrConfig {
    fn default() -> Self {
        Self {
            default_architecture_name: default_architecture_name(),
        }
    }
}

impl KernelConfig {
    /// Parse a TOML document
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML or mistyped keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file cannot be read, or
    /// `ConfigError::Parse` if its content is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = KernelConfig::from_toml_str("").unwrap();
        assert_eq!(config, KernelConfig::default());
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_entries, 256);
        assert_eq!(config.history.max_records_per_cell, 0);
        assert_eq!(config.diagram.default_format, "mermaid");
        assert_eq!(config.logging.profile, Profile::Development);
        assert_eq!(config.ir.default_architecture_name, "Architecture");
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = KernelConfig::from_toml_str(
            r#"
            [cache]
            enabled = false

            [logging]
            profile = "production"
            "#,
        )
        .unwrap();
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.max_entries, 256);
        assert_eq!(config.logging.profile, Profile::Production);
    }

    #[test]
    fn test_mistyped_value_is_a_parse_error() {
        let err = KernelConfig::from_toml_str("[cache]\nmax_entries = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("invalid kernel config"));
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let err = KernelConfig::load("/nonexistent/sruja-kernel.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
