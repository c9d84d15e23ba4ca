//! Feed configuration
//!
//! Loaded once at feed construction, either from defaults or from a JSON
//! file supplied by the embedding application.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Tunables for the call feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedConfig {
    /// Capacity of the contact-info cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Settle delay before the enrichment worker starts after the first
    /// data load, so initial rendering is not competing with lookups.
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,
    /// How long the idle worker waits before re-checking its queue and
    /// shutdown flag.
    #[serde(default = "default_idle_wait_ms")]
    pub idle_wait_ms: u64,
    /// ISO 3166-1 country code used to format numbers whose record does
    /// not carry one.
    #[serde(default = "default_country_iso")]
    pub country_iso: String,
    /// The carrier voicemail number, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voicemail_number: Option<String>,
}

fn default_cache_capacity() -> usize {
    100
}

fn default_start_delay_ms() -> u64 {
    1000
}

fn default_idle_wait_ms() -> u64 {
    1000
}

fn default_country_iso() -> String {
    "US".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            cache_capacity: default_cache_capacity(),
            start_delay_ms: default_start_delay_ms(),
            idle_wait_ms: default_idle_wait_ms(),
            country_iso: default_country_iso(),
            voicemail_number: None,
        }
    }
}

impl FeedConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Err(format!("Config file not found at {}", path.display()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        let config: FeedConfig =
            serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))?;

        if config.cache_capacity == 0 {
            return Err("cacheCapacity must be at least 1".to_string());
        }

        Ok(config)
    }
}
