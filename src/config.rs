//! Configuration file support for presign-guard.
//!
//! Loads optional TOML config from `<config_dir>/presign-guard/config.toml`.

use serde::Deserialize;
use std::path::PathBuf;

use crate::reputation::ContractInfo;
use crate::transaction::RiskLevel;

/// Default cap on the number of requests in one batch.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10;

/// Application configuration loaded from TOML file.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Maximum requests per batch (default: 10)
    pub max_batch_size: Option<usize>,
    /// Lowest overall risk that makes `analyze` exit non-zero (default: high)
    pub fail_on: Option<RiskLevel>,
    /// JSON file of narration templates
    pub templates_path: Option<PathBuf>,
    /// Extra reputation entries, merged over the built-in table
    pub contracts: Option<Vec<ContractInfo>>,
}

impl Config {
    /// Path of the config file.
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_default()
            .join("presign-guard")
            .join("config.toml")
    }

    /// Load config from the default path, falling back to defaults on any error.
    pub fn load() -> Self {
        let path = Self::path();
        match std::fs::read_to_string(&path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "loaded config");
                    config
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read config, using defaults");
                Self::default()
            }
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size.unwrap_or(DEFAULT_MAX_BATCH_SIZE)
    }

    pub fn fail_on(&self) -> RiskLevel {
        self.fail_on.unwrap_or(RiskLevel::High)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.max_batch_size(), DEFAULT_MAX_BATCH_SIZE);
        assert_eq!(config.fail_on(), RiskLevel::High);
        assert!(config.templates_path.is_none());
        assert!(config.contracts.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml_str(
            r#"
            max_batch_size = 4
            fail_on = "critical"
            templates_path = "/etc/presign-guard/templates.json"

            [[contracts]]
            address = "0x1111111111111111111111111111111111111111"
            name = "Internal Vault"
            reputation = 92
            verified = true
            category = "Vault"
            "#,
        )
        .unwrap();

        assert_eq!(config.max_batch_size(), 4);
        assert_eq!(config.fail_on(), RiskLevel::Critical);
        assert_eq!(
            config.templates_path.as_deref(),
            Some(std::path::Path::new("/etc/presign-guard/templates.json"))
        );
        let contracts = config.contracts.unwrap();
        assert_eq!(contracts.len(), 1);
        assert_eq!(contracts[0].reputation, 92);
    }

    #[test]
    fn test_invalid_risk_level_rejected() {
        assert!(Config::from_toml_str(r#"fail_on = "severe""#).is_err());
    }

    #[test]
    fn test_path_ends_with_crate_dir() {
        assert!(Config::path().ends_with("presign-guard/config.toml"));
    }
}
