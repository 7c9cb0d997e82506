// # DNS Record Store Trait
//
// Defines the small CRUD interface the engine uses against a zone's A records.
//
// ## Implementations
//
// - Cloudflare: `devdns-provider-cloudflare` crate
// - In-memory: `devdns_core::zone::MemoryZone` (tests, local runs)
//
// ## Usage
//
// ```rust,ignore
// use devdns_core::RecordStore;
//
// let store = /* RecordStore implementation */;
// if store.find_record_by_name("laptop.example.com").await?.is_none() {
//     store.create_record("laptop.example.com", "10.0.0.7".parse()?).await?;
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// The only record type the engine manages
pub const RECORD_TYPE_A: &str = "A";

/// An A record as reported by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Store-assigned record identifier
    pub id: String,
    /// Fully-qualified hostname
    pub name: String,
    /// Address the record points at
    pub address: Ipv4Addr,
}

impl DnsRecord {
    /// Create a new record value
    pub fn new(id: impl Into<String>, name: impl Into<String>, address: Ipv4Addr) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address,
        }
    }
}

/// Trait for DNS record store implementations
///
/// Every method is a single-shot call against the store. Implementations
/// must not retry, cache, or decide whether a mutation is needed; those
/// decisions belong to [`ReconcileEngine`](crate::ReconcileEngine).
///
/// # Trust Level: Untrusted
///
/// Stores may only talk to their own API endpoint and report success or
/// failure. A failed call aborts reconciliation of the current device.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Find the A record with exactly this hostname
    ///
    /// # Returns
    ///
    /// - `Ok(Some(DnsRecord))`: the first matching record
    /// - `Ok(None)`: no record with that name
    /// - `Err(Error)`: the lookup failed
    async fn find_record_by_name(&self, name: &str) -> Result<Option<DnsRecord>, crate::Error>;

    /// Find an A record bound to this address
    ///
    /// The zone is expected to hold at most one record per address; when it
    /// holds more, the first match is returned.
    async fn find_record_by_address(
        &self,
        address: Ipv4Addr,
    ) -> Result<Option<DnsRecord>, crate::Error>;

    /// Create an A record (fixed TTL, not proxied)
    async fn create_record(&self, name: &str, address: Ipv4Addr) -> Result<(), crate::Error>;

    /// Point an existing record at a new address
    async fn update_record(
        &self,
        id: &str,
        name: &str,
        address: Ipv4Addr,
    ) -> Result<(), crate::Error>;

    /// Delete a record by id
    async fn delete_record(&self, id: &str) -> Result<(), crate::Error>;

    /// Store name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}

/// Helper trait for constructing record stores from configuration
pub trait RecordStoreFactory: Send + Sync {
    /// Create a RecordStore instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn RecordStore>, crate::Error>;
}
