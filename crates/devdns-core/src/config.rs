//! Configuration types for the devdns system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::Ipv4Addr;

/// Default TTL (seconds) for A records the engine creates
pub const DEFAULT_RECORD_TTL: u32 = 60;

/// Main devdns configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevDnsConfig {
    /// Directory and record store provider
    pub provider: ProviderConfig,

    /// Suffix appended to every device name, e.g. "devices.example.com"
    pub domain_suffix: String,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Optional ingest server settings
    #[serde(default)]
    pub server: ServerConfig,
}

impl DevDnsConfig {
    /// Create a configuration with default engine and server settings
    pub fn new(provider: ProviderConfig, domain_suffix: impl Into<String>) -> Self {
        Self {
            provider,
            domain_suffix: domain_suffix.into(),
            engine: EngineConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_domain_suffix(&self.domain_suffix)?;
        self.provider.validate()?;
        self.engine.validate()?;
        self.server.validate()?;
        Ok(())
    }

    /// Domain suffix without leading or trailing dots
    pub fn normalized_suffix(&self) -> &str {
        self.domain_suffix.trim_matches('.')
    }
}

fn validate_domain_suffix(suffix: &str) -> Result<(), crate::Error> {
    let suffix = suffix.trim_matches('.');
    if suffix.is_empty() {
        return Err(crate::Error::config("Domain suffix cannot be empty"));
    }
    if suffix.len() > 253 {
        return Err(crate::Error::config(format!(
            "Domain suffix too long: {} chars (max 253)",
            suffix.len()
        )));
    }
    for label in suffix.split('.') {
        if label.is_empty() || label.len() > 63 {
            return Err(crate::Error::config(format!(
                "Domain suffix has an invalid label: '{}'",
                suffix
            )));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            || label.starts_with('-')
            || label.ends_with('-')
        {
            return Err(crate::Error::config(format!(
                "Domain suffix label '{}' must be alphanumeric with inner hyphens only",
                label
            )));
        }
    }
    Ok(())
}

/// Provider configuration for both the device directory and the record store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare DNS zone plus Zero Trust device directory
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// Account that owns the Zero Trust devices
        account_id: String,
        /// Zone that holds the device records
        zone_id: String,
        /// TTL for created and updated records
        #[serde(default = "default_record_ttl")]
        record_ttl: u32,
    },

    /// In-memory zone and a static device table
    Memory {
        /// Device id -> address
        #[serde(default)]
        devices: HashMap<String, Ipv4Addr>,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare {
                api_token,
                account_id,
                zone_id,
                record_ttl,
            } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                if account_id.is_empty() {
                    return Err(crate::Error::config("Cloudflare account ID cannot be empty"));
                }
                if zone_id.is_empty() {
                    return Err(crate::Error::config("Cloudflare zone ID cannot be empty"));
                }
                // 1 means "automatic" on Cloudflare, otherwise 60..=86400
                if *record_ttl != 1 && !(60..=86_400).contains(record_ttl) {
                    return Err(crate::Error::config(format!(
                        "Record TTL must be 1 (automatic) or between 60 and 86400. Got: {}",
                        record_ttl
                    )));
                }
                Ok(())
            }
            ProviderConfig::Memory { .. } => Ok(()),
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Memory { .. } => "memory",
        }
    }
}

fn default_record_ttl() -> u32 {
    DEFAULT_RECORD_TTL
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Wall-clock budget for one device (lookup + reconcile), in seconds
    ///
    /// A device that exceeds it is skipped; devices already reconciled keep
    /// their actions. Set to 0 to disable.
    #[serde(default = "default_device_timeout_secs")]
    pub device_timeout_secs: u64,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            device_timeout_secs: default_device_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_device_timeout_secs() -> u64 {
    20
}

fn default_event_channel_capacity() -> usize {
    1000
}

/// Ingest server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. "0.0.0.0:8080"
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Largest accepted (compressed) request body, in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Largest accepted decompressed batch, in bytes
    #[serde(default = "default_max_decoded_bytes")]
    pub max_decoded_bytes: usize,
}

impl ServerConfig {
    fn validate(&self) -> Result<(), crate::Error> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(crate::Error::config(format!(
                "Listen address must be a socket address like 0.0.0.0:8080. Got: {}",
                self.listen_addr
            )));
        }
        if self.max_body_bytes == 0 || self.max_decoded_bytes == 0 {
            return Err(crate::Error::config("Body size limits must be > 0"));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_body_bytes: default_max_body_bytes(),
            max_decoded_bytes: default_max_decoded_bytes(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_body_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_max_decoded_bytes() -> usize {
    128 * 1024 * 1024
}
