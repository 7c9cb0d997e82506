//! Test doubles and common utilities for reconciliation contract tests
//!
//! The doubles wrap the in-memory providers and record every call so tests
//! can assert on the exact sequence of store operations.

#![allow(dead_code)]

use devdns_core::config::{DevDnsConfig, EngineConfig, ProviderConfig};
use devdns_core::engine::EngineEvent;
use devdns_core::error::{Error, Result};
use devdns_core::traits::{DeviceDirectory, DnsRecord, RecordStore};
use devdns_core::{BatchOrchestrator, MemoryDirectory, MemoryZone, ReconcileEngine};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const SUFFIX: &str = "example.com";

pub fn ip(last: u8) -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, last)
}

/// One call made against a [`RecordingStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    FindByName(String),
    FindByAddress(Ipv4Addr),
    Create(String, Ipv4Addr),
    Update(String, String, Ipv4Addr),
    Delete(String),
}

impl StoreCall {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            StoreCall::Create(..) | StoreCall::Update(..) | StoreCall::Delete(..)
        )
    }
}

type FailPredicate = Box<dyn Fn(&StoreCall) -> bool + Send + Sync>;

/// A record store over a [`MemoryZone`] that records calls and can be told to fail
///
/// Clones share the zone, the call log and the injected behaviour.
#[derive(Clone)]
pub struct RecordingStore {
    zone: MemoryZone,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    fail_when: Arc<Mutex<Option<FailPredicate>>>,
    stall_when: Arc<Mutex<Option<FailPredicate>>>,
}

impl RecordingStore {
    pub fn new(zone: MemoryZone) -> Self {
        Self {
            zone,
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
            stall_when: Arc::new(Mutex::new(None)),
        }
    }

    pub fn empty() -> Self {
        Self::new(MemoryZone::new())
    }

    /// Make every call matching `predicate` fail (after being recorded)
    pub fn fail_when(&self, predicate: impl Fn(&StoreCall) -> bool + Send + Sync + 'static) {
        *self.fail_when.lock().unwrap() = Some(Box::new(predicate));
    }

    /// Make every call matching `predicate` hang for an hour (after being recorded)
    pub fn stall_when(&self, predicate: impl Fn(&StoreCall) -> bool + Send + Sync + 'static) {
        *self.stall_when.lock().unwrap() = Some(Box::new(predicate));
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<StoreCall> {
        self.calls().into_iter().filter(StoreCall::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn zone(&self) -> &MemoryZone {
        &self.zone
    }

    async fn record(&self, call: StoreCall) -> Result<()> {
        let stall = self
            .stall_when
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|predicate| predicate(&call));
        let fail = self
            .fail_when
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|predicate| predicate(&call));
        let description = format!("{:?}", call);
        self.calls.lock().unwrap().push(call);
        if stall {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if fail {
            return Err(Error::provider("recording", format!("injected failure: {}", description)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordStore for RecordingStore {
    async fn find_record_by_name(&self, name: &str) -> Result<Option<DnsRecord>> {
        self.record(StoreCall::FindByName(name.to_string())).await?;
        self.zone.find_record_by_name(name).await
    }

    async fn find_record_by_address(&self, address: Ipv4Addr) -> Result<Option<DnsRecord>> {
        self.record(StoreCall::FindByAddress(address)).await?;
        self.zone.find_record_by_address(address).await
    }

    async fn create_record(&self, name: &str, address: Ipv4Addr) -> Result<()> {
        self.record(StoreCall::Create(name.to_string(), address)).await?;
        self.zone.create_record(name, address).await
    }

    async fn update_record(&self, id: &str, name: &str, address: Ipv4Addr) -> Result<()> {
        self.record(StoreCall::Update(id.to_string(), name.to_string(), address)).await?;
        self.zone.update_record(id, name, address).await
    }

    async fn delete_record(&self, id: &str) -> Result<()> {
        self.record(StoreCall::Delete(id.to_string())).await?;
        self.zone.delete_record(id).await
    }

    fn store_name(&self) -> &'static str {
        "recording"
    }
}

/// A device directory that counts lookups and can stall selected devices
#[derive(Clone)]
pub struct CountingDirectory {
    inner: MemoryDirectory,
    lookups: Arc<Mutex<Vec<String>>>,
    lookup_count: Arc<AtomicUsize>,
    stalled: Arc<Mutex<Vec<String>>>,
}

impl CountingDirectory {
    pub fn new(devices: &[(&str, Ipv4Addr)]) -> Self {
        let map: HashMap<String, Ipv4Addr> = devices
            .iter()
            .map(|(id, address)| (id.to_string(), *address))
            .collect();
        Self {
            inner: MemoryDirectory::new(map),
            lookups: Arc::new(Mutex::new(Vec::new())),
            lookup_count: Arc::new(AtomicUsize::new(0)),
            stalled: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make lookups for `device_id` hang for an hour
    pub fn stall(&self, device_id: &str) {
        self.stalled.lock().unwrap().push(device_id.to_string());
    }

    pub fn lookup_count(&self) -> usize {
        self.lookup_count.load(Ordering::SeqCst)
    }

    pub fn looked_up(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DeviceDirectory for CountingDirectory {
    async fn lookup_device(&self, device_id: &str) -> Option<Ipv4Addr> {
        self.lookup_count.fetch_add(1, Ordering::SeqCst);
        self.lookups.lock().unwrap().push(device_id.to_string());

        let stalled = self.stalled.lock().unwrap().iter().any(|id| id == device_id);
        if stalled {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        self.inner.lookup_device(device_id).await
    }

    fn directory_name(&self) -> &'static str {
        "counting"
    }
}

/// Minimal configuration for tests
pub fn test_config() -> DevDnsConfig {
    let mut config = DevDnsConfig::new(
        ProviderConfig::Memory {
            devices: HashMap::new(),
        },
        SUFFIX,
    );
    config.engine = EngineConfig {
        device_timeout_secs: 0,
        event_channel_capacity: 100,
    };
    config
}

pub fn engine_for(store: &RecordingStore) -> (ReconcileEngine, mpsc::Receiver<EngineEvent>) {
    ReconcileEngine::new(Box::new(store.clone()), &test_config())
        .expect("engine construction succeeds")
}

pub fn orchestrator_for(
    store: &RecordingStore,
    directory: &CountingDirectory,
    config: &DevDnsConfig,
) -> (BatchOrchestrator, mpsc::Receiver<EngineEvent>) {
    let (engine, events) = ReconcileEngine::new(Box::new(store.clone()), config)
        .expect("engine construction succeeds");
    let orchestrator = BatchOrchestrator::new(Box::new(directory.clone()), engine, &config.engine);
    (orchestrator, events)
}

/// Drain every event currently in the channel
pub fn drain(events: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}
