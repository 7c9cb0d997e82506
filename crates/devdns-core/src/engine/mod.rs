//! Reconciliation engine
//!
//! The ReconcileEngine is responsible for:
//! - Building the hostname for a resolved device
//! - Reading the live zone state that matters for that hostname
//! - Deciding which mutations bring the zone in line ([`plan`])
//! - Applying those mutations in order through the [`RecordStore`]
//!
//! ## Architecture
//!
//! ```text
//! ResolvedDevice ──► DesiredRecord ──► observe() ──► ZoneView
//!                                                      │
//!                                                      ▼
//!                                   plan(view, desired) (pure)
//!                                                      │
//!                                                      ▼
//!                                     ZoneMutationPlan ──► execute ──► RecordStore
//!                                                      │
//!                                                      ▼
//!                                  ReconciliationAction + EngineEvent
//! ```
//!
//! ## Ordering
//!
//! When the target address is already held by another hostname, the stale
//! record is deleted before the device's own record is updated. A crash
//! between the two steps leaves the hostname pointing at its old address,
//! never two hostnames claiming the new one. The two steps are not
//! transactional and nothing is rolled back; the `ReconcileFailed` event
//! lists what was already applied.

use crate::config::DevDnsConfig;
use crate::error::{Error, Result};
use crate::model::{ActionKind, ReconciliationAction, ResolvedDevice};
use crate::traits::{DnsRecord, RecordStore};
use std::future::Future;
use std::net::Ipv4Addr;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// The record a device should have
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredRecord {
    /// Fully-qualified hostname
    pub name: String,
    /// Address the hostname must resolve to
    pub address: Ipv4Addr,
}

impl DesiredRecord {
    /// Build the desired record for a device under `domain_suffix`
    pub fn for_device(device: &ResolvedDevice, domain_suffix: &str) -> Self {
        Self {
            name: format!("{}.{}", device.device_name, domain_suffix),
            address: device.address,
        }
    }
}

/// Live zone state relevant to one desired record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneView {
    /// Record currently holding the desired hostname
    pub by_name: Option<DnsRecord>,
    /// Record currently bound to the desired address
    ///
    /// Only looked up when `by_name` exists with a different address.
    pub by_address: Option<DnsRecord>,
}

/// A single store command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Create a new A record
    Create { name: String, address: Ipv4Addr },
    /// Re-point an existing record
    Update {
        id: String,
        name: String,
        address: Ipv4Addr,
    },
    /// Delete a stale record that holds the target address
    Delete { id: String, name: String },
}

impl Mutation {
    fn verb(&self) -> &'static str {
        match self {
            Mutation::Create { .. } => "create",
            Mutation::Update { .. } => "update",
            Mutation::Delete { .. } => "delete",
        }
    }
}

/// Ordered mutations plus the action to report once they all succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneMutationPlan {
    /// Commands to run, in order
    pub mutations: Vec<Mutation>,
    /// Audit entry for the caller
    pub action: ReconciliationAction,
    /// Address the hostname held before, if it existed
    pub previous_address: Option<Ipv4Addr>,
}

/// Decide how to bring `view` in line with `desired`
///
/// - no record for the hostname: create it
/// - record with the same address: nothing to do
/// - record with another address: delete whichever other record holds the
///   target address (if any), then update the record
pub fn plan(view: &ZoneView, desired: &DesiredRecord) -> ZoneMutationPlan {
    let Some(existing) = &view.by_name else {
        return ZoneMutationPlan {
            mutations: vec![Mutation::Create {
                name: desired.name.clone(),
                address: desired.address,
            }],
            action: ReconciliationAction::new(ActionKind::Created, &desired.name, desired.address),
            previous_address: None,
        };
    };

    if existing.address == desired.address {
        return ZoneMutationPlan {
            mutations: Vec::new(),
            action: ReconciliationAction::new(ActionKind::NoChange, &desired.name, desired.address),
            previous_address: Some(existing.address),
        };
    }

    let mut mutations = Vec::with_capacity(2);
    let mut action = ReconciliationAction::new(ActionKind::Updated, &desired.name, desired.address);

    // A store may echo the hostname's own record back; that is not a duplicate.
    if let Some(duplicate) = view
        .by_address
        .as_ref()
        .filter(|duplicate| duplicate.id != existing.id)
    {
        mutations.push(Mutation::Delete {
            id: duplicate.id.clone(),
            name: duplicate.name.clone(),
        });
        action = action.with_deleted_duplicate(&duplicate.name);
    }

    mutations.push(Mutation::Update {
        id: existing.id.clone(),
        name: desired.name.clone(),
        address: desired.address,
    });

    ZoneMutationPlan {
        mutations,
        action,
        previous_address: Some(existing.address),
    }
}

/// Events emitted by the ReconcileEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Reconciliation of a hostname started
    ReconcileStarted { name: String, address: Ipv4Addr },

    /// A record was created
    RecordCreated { name: String, address: Ipv4Addr },

    /// A record was re-pointed
    RecordUpdated {
        name: String,
        previous_address: Option<Ipv4Addr>,
        address: Ipv4Addr,
        deleted_duplicate: Option<String>,
    },

    /// The record already matched
    RecordUnchanged { name: String, address: Ipv4Addr },

    /// Reconciliation failed part-way
    ///
    /// `applied` lists the mutations that succeeded before the failure.
    /// They are not compensated.
    ReconcileFailed {
        name: String,
        error: String,
        applied: Vec<Mutation>,
    },
}

/// Reconciliation engine
///
/// Holds the record store and reconciles one device per call. It keeps no
/// state between calls; every call re-reads the zone.
pub struct ReconcileEngine {
    /// Record store for the managed zone
    store: Box<dyn RecordStore>,

    /// Suffix appended to device names
    domain_suffix: String,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl ReconcileEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        store: Box<dyn RecordStore>,
        config: &DevDnsConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            store,
            domain_suffix: config.normalized_suffix().to_string(),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Domain suffix hostnames are built under
    pub fn domain_suffix(&self) -> &str {
        &self.domain_suffix
    }

    /// Reconcile one device against the zone
    ///
    /// # Returns
    ///
    /// - `Ok(ReconciliationAction)`: every planned mutation succeeded
    /// - `Err(Error)`: a lookup or mutation failed; earlier mutations stay applied
    pub async fn reconcile(&self, device: &ResolvedDevice) -> Result<ReconciliationAction> {
        self.reconcile_until(device, None).await
    }

    /// Reconcile one device, giving up on any store call still pending at `deadline`
    ///
    /// Expiry is reported like any other failure: `Error::Timeout` is
    /// returned and `ReconcileFailed` lists the mutations applied before it.
    pub async fn reconcile_until(
        &self,
        device: &ResolvedDevice,
        deadline: Option<Instant>,
    ) -> Result<ReconciliationAction> {
        let desired = DesiredRecord::for_device(device, &self.domain_suffix);

        self.emit_event(EngineEvent::ReconcileStarted {
            name: desired.name.clone(),
            address: desired.address,
        });

        let mut applied = Vec::new();
        match self.try_reconcile(&desired, deadline, &mut applied).await {
            Ok(plan) => {
                self.report(&plan);
                Ok(plan.action)
            }
            Err(e) => {
                error!(
                    "Failed to reconcile {} -> {} ({} mutation(s) applied): {}",
                    desired.name,
                    desired.address,
                    applied.len(),
                    e
                );
                self.emit_event(EngineEvent::ReconcileFailed {
                    name: desired.name,
                    error: e.to_string(),
                    applied,
                });
                Err(e)
            }
        }
    }

    async fn try_reconcile(
        &self,
        desired: &DesiredRecord,
        deadline: Option<Instant>,
        applied: &mut Vec<Mutation>,
    ) -> Result<ZoneMutationPlan> {
        let view = within(deadline, "zone lookup", self.observe(desired)).await?;
        let plan = plan(&view, desired);

        for mutation in &plan.mutations {
            within(deadline, mutation.verb(), self.apply(mutation)).await?;
            applied.push(mutation.clone());
        }

        Ok(plan)
    }

    /// Read the zone state `plan` needs
    ///
    /// The address lookup only happens when the hostname exists and points
    /// elsewhere, so creates and no-ops cost a single query.
    async fn observe(&self, desired: &DesiredRecord) -> Result<ZoneView> {
        let by_name = self.store.find_record_by_name(&desired.name).await?;

        let by_address = match &by_name {
            Some(existing) if existing.address != desired.address => {
                debug!(
                    "{} points at {}, checking for another record on {}",
                    desired.name, existing.address, desired.address
                );
                self.store.find_record_by_address(desired.address).await?
            }
            _ => None,
        };

        Ok(ZoneView { by_name, by_address })
    }

    async fn apply(&self, mutation: &Mutation) -> Result<()> {
        match mutation {
            Mutation::Create { name, address } => {
                debug!("Creating {} -> {} via {}", name, address, self.store.store_name());
                self.store.create_record(name, *address).await
            }
            Mutation::Update { id, name, address } => {
                debug!("Updating {} ({}) -> {}", name, id, address);
                self.store.update_record(id, name, *address).await
            }
            Mutation::Delete { id, name } => {
                info!("Deleting duplicate record {} ({})", name, id);
                self.store.delete_record(id).await
            }
        }
    }

    fn report(&self, plan: &ZoneMutationPlan) {
        let action = &plan.action;
        let event = match action.kind {
            ActionKind::Created => {
                info!("Created {} -> {}", action.name, action.address);
                EngineEvent::RecordCreated {
                    name: action.name.clone(),
                    address: action.address,
                }
            }
            ActionKind::Updated => {
                info!(
                    "Updated {} -> {} (previous: {:?}, deleted duplicate: {:?})",
                    action.name, action.address, plan.previous_address, action.deleted_duplicate_name
                );
                EngineEvent::RecordUpdated {
                    name: action.name.clone(),
                    previous_address: plan.previous_address,
                    address: action.address,
                    deleted_duplicate: action.deleted_duplicate_name.clone(),
                }
            }
            ActionKind::NoChange => {
                debug!("{} already points at {}", action.name, action.address);
                EngineEvent::RecordUnchanged {
                    name: action.name.clone(),
                    address: action.address,
                }
            }
        };
        self.emit_event(event);
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        // A closed receiver means nobody is listening, which is fine.
        if let Err(mpsc::error::TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

/// Run `step` until `deadline`, mapping expiry to `Error::Timeout`
async fn within<T>(
    deadline: Option<Instant>,
    step: &str,
    work: impl Future<Output = Result<T>>,
) -> Result<T> {
    let Some(deadline) = deadline else {
        return work.await;
    };

    match tokio::time::timeout_at(deadline, work).await {
        Ok(result) => result,
        Err(_) => Err(Error::timeout(format!("{} exceeded the device time budget", step))),
    }
}
