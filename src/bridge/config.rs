//! Bridge configuration
//!
//! Naming conventions for derived record types and invocation logging
//! switches, persisted as pretty-printed JSON.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for the service bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Prefix of positional field names for unnamed parameters (default: `arg`)
    pub positional_prefix: String,

    /// Output field name when the method does not name its result
    pub response_field: String,

    /// Suffix appended to the operation name to form the output record name
    pub response_suffix: String,

    /// Log argument values, not just their kinds, when invoking
    pub trace_arguments: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            positional_prefix: "arg".to_string(),
            response_field: "response".to_string(),
            response_suffix: "Response".to_string(),
            trace_arguments: false,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a JSON file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = serde_json::from_slice(&data).context("Failed to deserialize config")?;
        Ok(config)
    }

    /// Write configuration as pretty JSON, replacing the file atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self).context("Failed to serialize config")?;
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &json)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to rename into {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = BridgeConfig::load(&temp.path().join("bridge.json")).unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn partial_files_keep_remaining_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bridge.json");
        fs::write(&path, br#"{ "positional_prefix": "p" }"#).unwrap();
        let config = BridgeConfig::load(&path).unwrap();
        assert_eq!(config.positional_prefix, "p");
        assert_eq!(config.response_field, "response");
    }

    #[test]
    fn save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bridge.json");
        let config = BridgeConfig {
            trace_arguments: true,
            ..BridgeConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(BridgeConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn malformed_files_are_errors() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bridge.json");
        fs::write(&path, b"not json").unwrap();
        assert!(BridgeConfig::load(&path).is_err());
    }
}
