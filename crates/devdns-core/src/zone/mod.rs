// # In-memory providers
//
// This module provides process-local implementations of the RecordStore and
// DeviceDirectory traits.

pub mod memory;

pub use memory::{MemoryDirectory, MemoryDirectoryFactory, MemoryZone, MemoryZoneFactory};
