//! Core traits for the devdns system
//!
//! This module defines the capability interfaces the engine is injected with.
//!
//! - [`DeviceDirectory`]: Resolve a device identifier to its address
//! - [`RecordStore`]: Query and mutate A records in a zone

pub mod device_directory;
pub mod record_store;

pub use device_directory::{DeviceDirectory, DeviceDirectoryFactory};
pub use record_store::{DnsRecord, RECORD_TYPE_A, RecordStore, RecordStoreFactory};
