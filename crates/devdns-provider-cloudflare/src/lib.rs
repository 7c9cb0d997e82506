// # Cloudflare Provider
//
// This crate provides the Cloudflare implementations of the devdns record
// store and device directory.
//
// - `CloudflareRecordStore`: A records in one zone (DNS API v4)
// - `CloudflareDeviceDirectory`: device addresses from the Zero Trust devices API
//
// ## Behavior
//
// - One HTTP request per trait call, no retries, no caching
// - HTTP timeout of 30 seconds
// - Status mapping: 401/403 auth, 404 not found, 409 conflict, 429 rate limit, 5xx transient
// - `"success": false` envelopes are provider errors even on HTTP 200
// - Dry-run mode (`DEVDNS_MODE=dry-run`): lookups run, mutations are logged only
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Construction fails fast if the token is empty
//
// ## API Reference
//
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=A&name=...` (or `&content=...`)
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`
// - Device details: GET `/accounts/:account_id/devices/:device_id`

mod api;
mod devices;
mod records;

pub use api::CLOUDFLARE_API_BASE;
pub use devices::CloudflareDeviceDirectory;
pub use records::CloudflareRecordStore;

use devdns_core::config::ProviderConfig;
use devdns_core::traits::{
    DeviceDirectory, DeviceDirectoryFactory, RecordStore, RecordStoreFactory,
};
use devdns_core::{Error, ProviderRegistry, Result};

/// Environment variable selecting the run mode
pub const MODE_ENV: &str = "DEVDNS_MODE";

/// Environment variable overriding the API base URL
pub const API_BASE_ENV: &str = "DEVDNS_CLOUDFLARE_API_BASE";

fn dry_run_from_env() -> bool {
    std::env::var(MODE_ENV)
        .unwrap_or_default()
        .eq_ignore_ascii_case("dry-run")
}

fn api_base_from_env() -> Option<String> {
    std::env::var(API_BASE_ENV).ok().filter(|base| !base.is_empty())
}

/// Factory for creating Cloudflare record stores
pub struct CloudflareRecordStoreFactory;

impl RecordStoreFactory for CloudflareRecordStoreFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn RecordStore>> {
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                zone_id,
                record_ttl,
                ..
            } => {
                let dry_run = dry_run_from_env();
                if dry_run {
                    tracing::warn!(
                        "Cloudflare record store running in DRY-RUN mode - no changes will be made"
                    );
                }

                let mut store =
                    CloudflareRecordStore::new(api_token.clone(), zone_id.clone(), *record_ttl, dry_run)?;
                if let Some(base) = api_base_from_env() {
                    store = store.with_api_base(base);
                }
                Ok(Box::new(store))
            }
            _ => Err(Error::config("Invalid config for Cloudflare record store")),
        }
    }
}

/// Factory for creating Cloudflare device directories
pub struct CloudflareDirectoryFactory;

impl DeviceDirectoryFactory for CloudflareDirectoryFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DeviceDirectory>> {
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                account_id,
                ..
            } => {
                let mut directory =
                    CloudflareDeviceDirectory::new(api_token.clone(), account_id.clone())?;
                if let Some(base) = api_base_from_env() {
                    directory = directory.with_api_base(base);
                }
                Ok(Box::new(directory))
            }
            _ => Err(Error::config("Invalid config for Cloudflare device directory")),
        }
    }
}

/// Register the Cloudflare record store and device directory with a registry
///
/// # Example
///
/// ```rust
/// use devdns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// devdns_provider_cloudflare::register(&registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &ProviderRegistry) {
    registry.register_record_store("cloudflare", Box::new(CloudflareRecordStoreFactory));
    registry.register_device_directory("cloudflare", Box::new(CloudflareDirectoryFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn cloudflare_config(api_token: &str) -> ProviderConfig {
        ProviderConfig::Cloudflare {
            api_token: api_token.to_string(),
            account_id: "test_account".to_string(),
            zone_id: "test_zone".to_string(),
            record_ttl: 60,
        }
    }

    #[test]
    fn test_factory_creation() {
        let config = cloudflare_config("test_token");

        let store = CloudflareRecordStoreFactory.create(&config).unwrap();
        assert_eq!(store.store_name(), "cloudflare");

        let directory = CloudflareDirectoryFactory.create(&config).unwrap();
        assert_eq!(directory.directory_name(), "cloudflare");
    }

    #[test]
    fn test_factory_missing_token() {
        let config = cloudflare_config("");

        assert!(CloudflareRecordStoreFactory.create(&config).is_err());
        assert!(CloudflareDirectoryFactory.create(&config).is_err());
    }

    #[test]
    fn test_factory_rejects_other_provider() {
        let config = ProviderConfig::Memory {
            devices: HashMap::new(),
        };

        assert!(CloudflareRecordStoreFactory.create(&config).is_err());
        assert!(CloudflareDirectoryFactory.create(&config).is_err());
    }

    #[test]
    fn test_register_through_registry() {
        let registry = ProviderRegistry::new();
        register(&registry);

        let config = cloudflare_config("test_token");
        assert!(registry.create_record_store(&config).is_ok());
        assert!(registry.create_device_directory(&config).is_ok());
    }
}
