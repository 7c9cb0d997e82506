//! Data model shared by the ingest decoder, the batch orchestrator and the engine.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// A single decoded log line that names a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Opaque device identifier, used as the deduplication key
    pub device_id: String,
    /// Device name, becomes the leftmost label of the hostname
    pub device_name: String,
}

impl Observation {
    /// Create a new observation
    pub fn new(device_id: impl Into<String>, device_name: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            device_name: device_name.into(),
        }
    }
}

/// A device name paired with the address the device directory reported for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDevice {
    /// Device name
    pub device_name: String,
    /// Current IPv4 address of the device
    pub address: Ipv4Addr,
}

impl ResolvedDevice {
    /// Create a new resolved device
    pub fn new(device_name: impl Into<String>, address: Ipv4Addr) -> Self {
        Self {
            device_name: device_name.into(),
            address,
        }
    }
}

/// What the engine did for one device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    /// A new A record was created
    Created,
    /// An existing A record was pointed at a new address
    Updated,
    /// The existing A record already had the right address
    NoChange,
}

/// Audit entry returned to the caller, one per successfully reconciled device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationAction {
    /// Action taken
    pub kind: ActionKind,
    /// Fully-qualified hostname
    pub name: String,
    /// Address the hostname now resolves to
    pub address: Ipv4Addr,
    /// Hostname of the stale record deleted to free the address, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_duplicate_name: Option<String>,
}

impl ReconciliationAction {
    pub(crate) fn new(kind: ActionKind, name: impl Into<String>, address: Ipv4Addr) -> Self {
        Self {
            kind,
            name: name.into(),
            address,
            deleted_duplicate_name: None,
        }
    }

    pub(crate) fn with_deleted_duplicate(mut self, name: impl Into<String>) -> Self {
        self.deleted_duplicate_name = Some(name.into());
        self
    }
}
