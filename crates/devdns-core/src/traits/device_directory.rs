// # Device Directory Trait
//
// Defines the lookup that turns a device identifier into its current address.
//
// ## Implementations
//
// - Cloudflare Zero Trust devices API: `devdns-provider-cloudflare` crate
// - Static map: `devdns_core::zone::MemoryDirectory`

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for device directory implementations
///
/// # Contract
///
/// `lookup_device` never fails. Transport errors, unknown devices and
/// records without a usable IPv4 address all come back as `None`; the
/// implementation logs the reason. The orchestrator then drops the device
/// from the batch without touching the DNS store.
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    /// Resolve a device identifier to its current IPv4 address
    async fn lookup_device(&self, device_id: &str) -> Option<Ipv4Addr>;

    /// Directory name (for logging/debugging)
    fn directory_name(&self) -> &'static str;
}

/// Helper trait for constructing device directories from configuration
pub trait DeviceDirectoryFactory: Send + Sync {
    /// Create a DeviceDirectory instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DeviceDirectory>, crate::Error>;
}
