// # devdns-core
//
// Core library for keeping device hostnames in a DNS zone in step with the
// addresses a device directory reports for them.
//
// ## Architecture Overview
//
// - **DeviceDirectory**: Trait resolving a device id to its current IPv4 address
// - **RecordStore**: Trait for querying and mutating A records in a zone
// - **ReconcileEngine**: Decides and applies create / update / no-change per device
// - **BatchOrchestrator**: Deduplicates a batch and drives the engine per device
// - **ingest**: Decodes gzip-compressed newline-delimited JSON batches
// - **ProviderRegistry**: Plugin-based registry for stores and directories
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Decision logic is a pure function over a zone view
// 2. **Sequential**: One batch at a time, one device at a time
// 3. **Plugin-Based**: Providers are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Idempotency**: Re-running a batch against a consistent zone changes nothing

pub mod traits;
pub mod engine;
pub mod batch;
pub mod ingest;
pub mod model;
pub mod registry;
pub mod config;
pub mod error;
pub mod zone;

// Re-export core types for convenience
pub use traits::{DeviceDirectory, DnsRecord, RecordStore};
pub use engine::{EngineEvent, ReconcileEngine};
pub use batch::{BatchOrchestrator, BatchReport, ObservationSet};
pub use model::{ActionKind, Observation, ReconciliationAction, ResolvedDevice};
pub use registry::ProviderRegistry;
pub use config::{DevDnsConfig, EngineConfig, ProviderConfig, ServerConfig};
pub use error::{Error, Result};
pub use zone::{MemoryDirectory, MemoryZone};
