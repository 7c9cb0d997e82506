// # Memory Zone
//
// In-memory implementations of RecordStore and DeviceDirectory.
//
// ## Purpose
//
// Provides a zone that lives only as long as the process, plus a static
// device table. Useful for tests, local runs of the daemon, and trying out
// batches without touching a real zone.
//
// ## Behavior
//
// - Records are kept in insertion order; address lookups return the first match
// - Record ids are assigned sequentially ("rec-1", "rec-2", ...)
// - Updating or deleting an unknown id is a NotFound error, like a real API

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::RwLock;
use async_trait::async_trait;

use crate::config::ProviderConfig;
use crate::traits::{
    DeviceDirectory, DeviceDirectoryFactory, DnsRecord, RecordStore, RecordStoreFactory,
};
use crate::Error;

#[derive(Debug, Default)]
struct ZoneState {
    records: Vec<DnsRecord>,
    next_id: u64,
}

impl ZoneState {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("rec-{}", self.next_id)
    }
}

/// In-memory record store
///
/// Clones share the same zone.
///
/// # Example
///
/// ```rust,no_run
/// use devdns_core::zone::MemoryZone;
/// use devdns_core::traits::RecordStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let zone = MemoryZone::new();
///     zone.create_record("laptop.example.com", "10.0.0.7".parse()?).await?;
///
///     let record = zone.find_record_by_name("laptop.example.com").await?;
///     assert!(record.is_some());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryZone {
    inner: Arc<RwLock<ZoneState>>,
}

impl MemoryZone {
    /// Create an empty zone
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a zone pre-populated with `(name, address)` records
    pub fn with_records<I, S>(records: I) -> Self
    where
        I: IntoIterator<Item = (S, Ipv4Addr)>,
        S: Into<String>,
    {
        let mut state = ZoneState::default();
        for (name, address) in records {
            let id = state.allocate_id();
            state.records.push(DnsRecord::new(id, name, address));
        }
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Snapshot of every record in the zone
    pub async fn records(&self) -> Vec<DnsRecord> {
        self.inner.read().await.records.clone()
    }

    /// Number of records in the zone
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Check if the zone is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryZone {
    async fn find_record_by_name(&self, name: &str) -> Result<Option<DnsRecord>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.records.iter().find(|r| r.name == name).cloned())
    }

    async fn find_record_by_address(&self, address: Ipv4Addr) -> Result<Option<DnsRecord>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.records.iter().find(|r| r.address == address).cloned())
    }

    async fn create_record(&self, name: &str, address: Ipv4Addr) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        let id = guard.allocate_id();
        guard.records.push(DnsRecord::new(id, name, address));
        Ok(())
    }

    async fn update_record(&self, id: &str, name: &str, address: Ipv4Addr) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        let record = guard
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::not_found(format!("DNS record not found: {}", id)))?;
        record.name = name.to_string();
        record.address = address;
        Ok(())
    }

    async fn delete_record(&self, id: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        let before = guard.records.len();
        guard.records.retain(|r| r.id != id);
        if guard.records.len() == before {
            return Err(Error::not_found(format!("DNS record not found: {}", id)));
        }
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}

/// Static device table
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    devices: HashMap<String, Ipv4Addr>,
}

impl MemoryDirectory {
    /// Create a directory from a device id -> address map
    pub fn new(devices: HashMap<String, Ipv4Addr>) -> Self {
        Self { devices }
    }

    /// Add or replace a device
    pub fn with_device(mut self, device_id: impl Into<String>, address: Ipv4Addr) -> Self {
        self.devices.insert(device_id.into(), address);
        self
    }
}

#[async_trait]
impl DeviceDirectory for MemoryDirectory {
    async fn lookup_device(&self, device_id: &str) -> Option<Ipv4Addr> {
        self.devices.get(device_id).copied()
    }

    fn directory_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory for the in-memory record store
pub struct MemoryZoneFactory;

impl RecordStoreFactory for MemoryZoneFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn RecordStore>, Error> {
        match config {
            ProviderConfig::Memory { .. } => Ok(Box::new(MemoryZone::new())),
            _ => Err(Error::config("Invalid config for memory record store")),
        }
    }
}

/// Factory for the static device table
pub struct MemoryDirectoryFactory;

impl DeviceDirectoryFactory for MemoryDirectoryFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DeviceDirectory>, Error> {
        match config {
            ProviderConfig::Memory { devices } => {
                Ok(Box::new(MemoryDirectory::new(devices.clone())))
            }
            _ => Err(Error::config("Invalid config for memory device directory")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_zone_basic() {
        let zone = MemoryZone::new();
        assert!(zone.is_empty().await);

        let ip: Ipv4Addr = "10.0.0.1".parse().unwrap();
        zone.create_record("a.example.com", ip).await.unwrap();
        assert_eq!(zone.len().await, 1);

        let record = zone.find_record_by_name("a.example.com").await.unwrap().unwrap();
        assert_eq!(record.address, ip);
        assert_eq!(record.id, "rec-1");

        let by_address = zone.find_record_by_address(ip).await.unwrap();
        assert_eq!(by_address, Some(record.clone()));

        zone.delete_record(&record.id).await.unwrap();
        assert!(zone.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_zone_update() {
        let zone = MemoryZone::with_records([("a.example.com", Ipv4Addr::new(10, 0, 0, 1))]);

        zone.update_record("rec-1", "a.example.com", Ipv4Addr::new(10, 0, 0, 2))
            .await
            .unwrap();

        let records = zone.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].address, Ipv4Addr::new(10, 0, 0, 2));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let zone = MemoryZone::new();
        let ip = Ipv4Addr::new(10, 0, 0, 1);

        assert!(matches!(
            zone.update_record("rec-9", "a.example.com", ip).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(zone.delete_record("rec-9").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_memory_directory() {
        let directory = MemoryDirectory::default().with_device("d1", Ipv4Addr::new(10, 0, 0, 5));

        assert_eq!(directory.lookup_device("d1").await, Some(Ipv4Addr::new(10, 0, 0, 5)));
        assert_eq!(directory.lookup_device("d2").await, None);
    }
}
