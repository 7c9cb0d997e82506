//! Environment configuration for the daemon
//!
//! Every setting comes from a `DEVDNS_*` variable. Values are validated with
//! actionable messages before anything is started.

use anyhow::{Context, Result};
use devdns_core::config::{DevDnsConfig, EngineConfig, ProviderConfig, ServerConfig};
use std::collections::HashMap;
use std::net::Ipv4Addr;

/// Application configuration
#[derive(Debug)]
pub struct Config {
    pub provider_type: String,
    pub api_token: String,
    pub account_id: String,
    pub zone_id: String,
    pub domain_suffix: String,
    pub record_ttl: Option<u32>,
    pub memory_devices: HashMap<String, Ipv4Addr>,
    pub listen_addr: Option<String>,
    pub max_body_bytes: Option<usize>,
    pub max_decoded_bytes: Option<usize>,
    pub device_timeout_secs: Option<u64>,
    pub log_level: String,
    pub mode: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            provider_type: var("DEVDNS_PROVIDER_TYPE")
                .unwrap_or_else(|| "cloudflare".to_string())
                .to_lowercase(),
            api_token: var("DEVDNS_API_TOKEN").unwrap_or_default(),
            account_id: var("DEVDNS_ACCOUNT_ID").unwrap_or_default(),
            zone_id: var("DEVDNS_ZONE_ID").unwrap_or_default(),
            domain_suffix: var("DEVDNS_DOMAIN_SUFFIX").unwrap_or_default(),
            record_ttl: parse_opt(var("DEVDNS_RECORD_TTL"), "DEVDNS_RECORD_TTL")?,
            memory_devices: match var("DEVDNS_MEMORY_DEVICES") {
                Some(raw) => parse_devices(&raw)?,
                None => HashMap::new(),
            },
            listen_addr: var("DEVDNS_LISTEN_ADDR"),
            max_body_bytes: parse_opt(var("DEVDNS_MAX_BODY_BYTES"), "DEVDNS_MAX_BODY_BYTES")?,
            max_decoded_bytes: parse_opt(
                var("DEVDNS_MAX_DECODED_BYTES"),
                "DEVDNS_MAX_DECODED_BYTES",
            )?,
            device_timeout_secs: parse_opt(
                var("DEVDNS_DEVICE_TIMEOUT_SECS"),
                "DEVDNS_DEVICE_TIMEOUT_SECS",
            )?,
            log_level: var("DEVDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            mode: var("DEVDNS_MODE").unwrap_or_else(|| "live".to_string()),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match self.provider_type.as_str() {
            "cloudflare" => self.validate_cloudflare()?,
            "memory" => {}
            _ => anyhow::bail!(
                "DEVDNS_PROVIDER_TYPE '{}' is not supported. \
                Supported providers: cloudflare, memory",
                self.provider_type
            ),
        }

        if self.domain_suffix.is_empty() {
            anyhow::bail!(
                "DEVDNS_DOMAIN_SUFFIX is required. \
                Set it via: export DEVDNS_DOMAIN_SUFFIX=devices.example.com"
            );
        }

        match self.mode.to_lowercase().as_str() {
            "live" | "dry-run" => {}
            _ => anyhow::bail!(
                "DEVDNS_MODE '{}' is not valid. Valid modes: live, dry-run",
                self.mode
            ),
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DEVDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        // Remaining range checks live with the core config types
        self.to_devdns_config()
            .validate()
            .context("Configuration rejected")?;

        Ok(())
    }

    fn validate_cloudflare(&self) -> Result<()> {
        if self.api_token.is_empty() {
            anyhow::bail!(
                "DEVDNS_API_TOKEN is required. \
                Set it via: export DEVDNS_API_TOKEN=your_token"
            );
        }

        // Check for obvious placeholder tokens (common mistake)
        let token_lower = self.api_token.to_lowercase();
        if token_lower.contains("your_token")
            || token_lower.contains("replace_me")
            || token_lower == "token"
        {
            anyhow::bail!(
                "DEVDNS_API_TOKEN appears to be a placeholder. \
                Use an actual API token from the Cloudflare dashboard."
            );
        }

        if self.account_id.is_empty() {
            anyhow::bail!("DEVDNS_ACCOUNT_ID is required when DEVDNS_PROVIDER_TYPE=cloudflare");
        }
        if self.zone_id.is_empty() {
            anyhow::bail!("DEVDNS_ZONE_ID is required when DEVDNS_PROVIDER_TYPE=cloudflare");
        }
        if !self.memory_devices.is_empty() {
            anyhow::bail!("DEVDNS_MEMORY_DEVICES is only valid with DEVDNS_PROVIDER_TYPE=memory");
        }

        Ok(())
    }

    /// Whether the provider should only log mutations
    pub fn is_dry_run(&self) -> bool {
        self.mode.eq_ignore_ascii_case("dry-run")
    }

    /// Build the core configuration
    pub fn to_devdns_config(&self) -> DevDnsConfig {
        let provider = match self.provider_type.as_str() {
            "memory" => ProviderConfig::Memory {
                devices: self.memory_devices.clone(),
            },
            _ => ProviderConfig::Cloudflare {
                api_token: self.api_token.clone(),
                account_id: self.account_id.clone(),
                zone_id: self.zone_id.clone(),
                record_ttl: self
                    .record_ttl
                    .unwrap_or(devdns_core::config::DEFAULT_RECORD_TTL),
            },
        };

        let mut engine = EngineConfig::default();
        if let Some(secs) = self.device_timeout_secs {
            engine.device_timeout_secs = secs;
        }

        let mut server = ServerConfig::default();
        if let Some(ref addr) = self.listen_addr {
            server.listen_addr = addr.clone();
        }
        if let Some(bytes) = self.max_body_bytes {
            server.max_body_bytes = bytes;
        }
        if let Some(bytes) = self.max_decoded_bytes {
            server.max_decoded_bytes = bytes;
        }

        DevDnsConfig {
            provider,
            domain_suffix: self.domain_suffix.clone(),
            engine,
            server,
        }
    }
}

fn parse_opt<T>(raw: Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.map(|s| {
        s.trim()
            .parse::<T>()
            .with_context(|| format!("{} must be a non-negative integer. Got: {}", key, s))
    })
    .transpose()
}

/// Parse `id=ip,id=ip` into a device table
fn parse_devices(raw: &str) -> Result<HashMap<String, Ipv4Addr>> {
    let mut devices = HashMap::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (id, ip) = entry.split_once('=').with_context(|| {
            format!(
                "DEVDNS_MEMORY_DEVICES entry '{}' must look like device_id=10.0.0.7",
                entry
            )
        })?;
        let address: Ipv4Addr = ip.trim().parse().with_context(|| {
            format!("DEVDNS_MEMORY_DEVICES entry '{}' has an invalid IPv4 address", entry)
        })?;
        devices.insert(id.trim().to_string(), address);
    }
    Ok(devices)
}
