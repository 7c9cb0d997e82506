//! Batch orchestration
//!
//! Turns a decoded batch into a deduplicated work list and drives the
//! [`ReconcileEngine`] once per device, sequentially.
//!
//! ## Flow
//!
//! 1. Deduplicate observations by device id (last name wins)
//! 2. For each device, ask the [`DeviceDirectory`] for its address
//! 3. Devices without an address are skipped and never reach the store
//! 4. Resolved devices are reconciled one at a time
//! 5. Successful actions are collected in batch order
//!
//! A failure for one device (directory, store, or deadline) never stops the
//! batch. Work already committed for earlier devices is final.

use crate::config::EngineConfig;
use crate::engine::ReconcileEngine;
use crate::model::{Observation, ReconciliationAction, ResolvedDevice};
use crate::traits::DeviceDirectory;
use indexmap::IndexMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Device id -> device name, in first-seen order, last name wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationSet {
    entries: IndexMap<String, String>,
}

impl ObservationSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observation, replacing the name of an already-seen device
    ///
    /// Returns the replaced name, if any. The device keeps its original
    /// position in the batch.
    pub fn insert(&mut self, observation: Observation) -> Option<String> {
        let previous = self
            .entries
            .insert(observation.device_id, observation.device_name);
        if let Some(ref name) = previous {
            debug!("Device name {} superseded within batch", name);
        }
        previous
    }

    /// Name recorded for a device id
    pub fn get(&self, device_id: &str) -> Option<&str> {
        self.entries.get(device_id).map(String::as_str)
    }

    /// Number of unique devices
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(device_id, device_name)` pairs in batch order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(id, name)| (id.as_str(), name.as_str()))
    }
}

impl FromIterator<Observation> for ObservationSet {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        let mut set = Self::new();
        for observation in iter {
            set.insert(observation);
        }
        set
    }
}

/// Result of one batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Actions for every device that reconciled successfully, in batch order
    pub actions: Vec<ReconciliationAction>,
    /// Devices the directory could not resolve
    pub unresolved: usize,
    /// Devices whose reconciliation failed or timed out
    pub failed: usize,
}

enum DeviceOutcome {
    Reconciled(ReconciliationAction),
    Unresolved,
    Failed,
}

/// Drives the engine over a batch
pub struct BatchOrchestrator {
    directory: Box<dyn DeviceDirectory>,
    engine: ReconcileEngine,
    device_timeout: Option<Duration>,
    /// Serialises batches so two requests never interleave zone writes
    gate: Mutex<()>,
}

impl BatchOrchestrator {
    /// Create a new orchestrator
    pub fn new(
        directory: Box<dyn DeviceDirectory>,
        engine: ReconcileEngine,
        config: &EngineConfig,
    ) -> Self {
        let device_timeout = match config.device_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Self {
            directory,
            engine,
            device_timeout,
            gate: Mutex::new(()),
        }
    }

    /// Deduplicate `observations` and reconcile every device
    pub async fn run<I>(&self, observations: I) -> BatchReport
    where
        I: IntoIterator<Item = Observation>,
    {
        let set: ObservationSet = observations.into_iter().collect();
        self.run_set(&set).await
    }

    /// Reconcile every device of an already deduplicated set
    pub async fn run_set(&self, set: &ObservationSet) -> BatchReport {
        let _batch = self.gate.lock().await;

        info!("Reconciling batch of {} device(s)", set.len());

        let mut report = BatchReport::default();
        for (device_id, device_name) in set.iter() {
            match self.process_device(device_id, device_name).await {
                DeviceOutcome::Reconciled(action) => report.actions.push(action),
                DeviceOutcome::Unresolved => report.unresolved += 1,
                DeviceOutcome::Failed => report.failed += 1,
            }
        }

        info!(
            "Batch done: {} reconciled, {} unresolved, {} failed",
            report.actions.len(),
            report.unresolved,
            report.failed
        );

        report
    }

    async fn process_device(&self, device_id: &str, device_name: &str) -> DeviceOutcome {
        let deadline = self.device_timeout.map(|limit| Instant::now() + limit);
        self.resolve_and_reconcile(device_id, device_name, deadline).await
    }

    async fn resolve_and_reconcile(
        &self,
        device_id: &str,
        device_name: &str,
        deadline: Option<Instant>,
    ) -> DeviceOutcome {
        let lookup = self.directory.lookup_device(device_id);
        let resolved = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, lookup).await {
                Ok(resolved) => resolved,
                Err(_) => {
                    warn!(
                        "Device {} ({}) exceeded its {:?} budget during lookup, skipping",
                        device_name,
                        device_id,
                        self.device_timeout.unwrap_or_default()
                    );
                    return DeviceOutcome::Failed;
                }
            },
            None => lookup.await,
        };

        let Some(address) = resolved else {
            info!(
                "No address for device {} ({}) from {}, skipping",
                device_name,
                device_id,
                self.directory.directory_name()
            );
            return DeviceOutcome::Unresolved;
        };

        let device = ResolvedDevice::new(device_name, address);
        match self.engine.reconcile_until(&device, deadline).await {
            Ok(action) => DeviceOutcome::Reconciled(action),
            Err(e) => {
                warn!("Skipping device {} ({}): {}", device_name, device_id, e);
                DeviceOutcome::Failed
            }
        }
    }
}
