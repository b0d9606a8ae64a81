//! Configuration for the Harvester

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default metadata format requested from the endpoint
pub const DEFAULT_METADATA_PREFIX: &str = "lido";

/// Default number of 503 retries per request
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default request timeout (60 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for the Harvester
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// `metadataPrefix` of the initial request
    pub metadata_prefix: String,

    /// Maximum consecutive 503 retries before giving up
    pub max_retries: u32,

    /// Request timeout (seconds)
    pub timeout_secs: u64,

    /// `User-Agent` header
    pub user_agent: String,

    /// Optional `set` restriction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set: Option<String>,

    /// Optional lower datestamp bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Optional upper datestamp bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
}

impl HarvestConfig {
    /// Get the request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.metadata_prefix.trim().is_empty() {
            return Err("metadata_prefix must not be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            metadata_prefix: DEFAULT_METADATA_PREFIX.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: format!("lido2rdf/{}", env!("CARGO_PKG_VERSION")),
            set: None,
            from: None,
            until: None,
        }
    }
}
