//! Plugin-based provider registry
//!
//! The registry allows record stores and device directories to be
//! registered dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use devdns_core::registry::ProviderRegistry;
//!
//! let registry = ProviderRegistry::with_builtin();
//! devdns_provider_cloudflare::register(&registry);
//!
//! let store = registry.create_record_store(&config.provider)?;
//! let directory = registry.create_device_directory(&config.provider)?;
//! ```

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::traits::{DeviceDirectory, DeviceDirectoryFactory, RecordStore, RecordStoreFactory};
use crate::zone::{MemoryDirectoryFactory, MemoryZoneFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Provider registry for plugin-based store and directory creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered record store factories
    record_stores: RwLock<HashMap<String, Box<dyn RecordStoreFactory>>>,

    /// Registered device directory factories
    directories: RwLock<HashMap<String, Box<dyn DeviceDirectoryFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the in-memory provider registered as "memory"
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register_record_store("memory", Box::new(MemoryZoneFactory));
        registry.register_device_directory("memory", Box::new(MemoryDirectoryFactory));
        registry
    }

    /// Register a record store factory
    pub fn register_record_store(
        &self,
        name: impl Into<String>,
        factory: Box<dyn RecordStoreFactory>,
    ) {
        let mut stores = self
            .record_stores
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        stores.insert(name.into(), factory);
    }

    /// Register a device directory factory
    pub fn register_device_directory(
        &self,
        name: impl Into<String>,
        factory: Box<dyn DeviceDirectoryFactory>,
    ) {
        let mut directories = self
            .directories
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        directories.insert(name.into(), factory);
    }

    /// Create a record store from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn RecordStore>)`: Created store instance
    /// - `Err(Error)`: If the provider type is not registered or creation fails
    pub fn create_record_store(&self, config: &ProviderConfig) -> Result<Box<dyn RecordStore>> {
        let provider_type = config.type_name();
        let stores = self
            .record_stores
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = stores.get(provider_type).ok_or_else(|| {
            Error::config(format!("Unknown record store type: {}", provider_type))
        })?;

        factory.create(config)
    }

    /// Create a device directory from configuration
    pub fn create_device_directory(
        &self,
        config: &ProviderConfig,
    ) -> Result<Box<dyn DeviceDirectory>> {
        let provider_type = config.type_name();
        let directories = self
            .directories
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = directories.get(provider_type).ok_or_else(|| {
            Error::config(format!("Unknown device directory type: {}", provider_type))
        })?;

        factory.create(config)
    }

    /// List all registered record store types
    pub fn list_record_stores(&self) -> Vec<String> {
        let stores = self
            .record_stores
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        stores.keys().cloned().collect()
    }

    /// Check if a provider type has both a store and a directory registered
    pub fn has_provider(&self, name: &str) -> bool {
        let has_store = self
            .record_stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name);
        let has_directory = self
            .directories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name);
        has_store && has_directory
    }
}
