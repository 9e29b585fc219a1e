//! Session Configuration
//!
//! Loaded from a JSON file. Every field has a default, so an empty object (or
//! no file at all) yields a working testnet setup with two fixture providers.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::network::NetworkValidator;
use crate::service::ServiceSettings;
use crate::wallet::fixture::FixtureSpec;
use crate::wallet::NetworkType;

/// Environment override for the expected network
pub const EXPECTED_NETWORK_ENV: &str = "WALLET_EXPECTED_NETWORK";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    pub expected_network: NetworkType,
    pub allow_auto_switch: bool,
    pub availability_cache_ms: u64,
    pub availability_timeout_ms: u64,
    pub retry_unit_ms: u64,
    pub event_capacity: usize,
    pub monitor_interval_ms: u64,
    pub providers: Vec<FixtureSpec>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expected_network: NetworkType::Testnet,
            allow_auto_switch: false,
            availability_cache_ms: 5_000,
            availability_timeout_ms: 3_000,
            retry_unit_ms: 1_000,
            event_capacity: 64,
            monitor_interval_ms: 1_000,
            providers: vec![
                FixtureSpec {
                    id: "hashpack".to_string(),
                    name: Some("HashPack".to_string()),
                    icon: Some("/icons/hashpack.svg".to_string()),
                    account_id: "0.0.1001".to_string(),
                    network: NetworkType::Testnet,
                    balance: "100 ℏ".to_string(),
                    available: true,
                },
                FixtureSpec {
                    id: "blade".to_string(),
                    name: Some("Blade".to_string()),
                    icon: Some("/icons/blade.svg".to_string()),
                    account_id: "0.0.2002".to_string(),
                    network: NetworkType::Testnet,
                    balance: "0 ℏ".to_string(),
                    available: false,
                },
            ],
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SessionConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` when given, otherwise the built-in defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                debug!("No config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Apply `WALLET_EXPECTED_NETWORK` if set
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        match std::env::var(EXPECTED_NETWORK_ENV) {
            Ok(value) => self.override_network(&value),
            Err(_) => Ok(()),
        }
    }

    pub fn override_network(&mut self, value: &str) -> Result<(), ConfigError> {
        self.expected_network = value
            .parse()
            .map_err(ConfigError::Invalid)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid("eventCapacity must be > 0".to_string()));
        }
        if self.monitor_interval_ms == 0 {
            return Err(ConfigError::Invalid("monitorIntervalMs must be > 0".to_string()));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if provider.id.trim().is_empty() {
                return Err(ConfigError::Invalid("provider id must not be empty".to_string()));
            }
            if !seen.insert(provider.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate provider id: {}",
                    provider.id
                )));
            }
        }
        Ok(())
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            availability_ttl: Duration::from_millis(self.availability_cache_ms),
            availability_timeout: Duration::from_millis(self.availability_timeout_ms),
            retry_unit: Duration::from_millis(self.retry_unit_ms),
            event_capacity: self.event_capacity,
        }
    }

    pub fn validator(&self) -> NetworkValidator {
        NetworkValidator::new(self.expected_network, self.allow_auto_switch)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }
}
