//! Contract Test: Idempotency
//!
//! Reconciling the same device twice with no external change must create
//! the record once and report no-change afterwards.
//!
//! Constraints verified:
//! - `created` then `no-change`, never two creates
//! - Re-running a batch against a consistent zone issues no mutations
//! - A resolved duplicate stays resolved on the next run

mod common;

use common::*;
use devdns_core::{ActionKind, MemoryZone, Observation, ResolvedDevice};

#[tokio::test]
async fn reconcile_twice_creates_then_reports_no_change() {
    let store = RecordingStore::empty();
    let (engine, _events) = engine_for(&store);
    let device = ResolvedDevice::new("laptop", ip(7));

    let first = engine.reconcile(&device).await.expect("first reconcile succeeds");
    let second = engine.reconcile(&device).await.expect("second reconcile succeeds");

    assert_eq!(first.kind, ActionKind::Created);
    assert_eq!(first.name, "laptop.example.com");
    assert_eq!(second.kind, ActionKind::NoChange);
    assert_eq!(second.name, "laptop.example.com");

    assert_eq!(store.zone().len().await, 1, "no duplicate record may exist");
    assert_eq!(
        store.mutations(),
        vec![StoreCall::Create("laptop.example.com".to_string(), ip(7))]
    );
}

#[tokio::test]
async fn rerunning_a_batch_issues_no_mutations() {
    let store = RecordingStore::empty();
    let directory = CountingDirectory::new(&[("d1", ip(1)), ("d2", ip(2))]);
    let (orchestrator, _events) = orchestrator_for(&store, &directory, &test_config());
    let batch = vec![Observation::new("d1", "alpha"), Observation::new("d2", "beta")];

    let first = orchestrator.run(batch.clone()).await;
    assert!(first.actions.iter().all(|a| a.kind == ActionKind::Created));

    store.clear_calls();
    let second = orchestrator.run(batch).await;

    assert_eq!(second.actions.len(), 2);
    assert!(second.actions.iter().all(|a| a.kind == ActionKind::NoChange));
    assert!(store.mutations().is_empty());
    assert_eq!(store.zone().len().await, 2);
}

#[tokio::test]
async fn resolved_duplicate_is_not_touched_again() {
    let zone = MemoryZone::with_records([("a.example.com", ip(1)), ("b.example.com", ip(9))]);
    let store = RecordingStore::new(zone);
    let (engine, _events) = engine_for(&store);
    let device = ResolvedDevice::new("b", ip(1));

    let first = engine.reconcile(&device).await.unwrap();
    assert_eq!(first.kind, ActionKind::Updated);

    store.clear_calls();
    let second = engine.reconcile(&device).await.unwrap();

    assert_eq!(second.kind, ActionKind::NoChange);
    assert_eq!(second.deleted_duplicate_name, None);
    assert_eq!(
        store.calls(),
        vec![StoreCall::FindByName("b.example.com".to_string())]
    );
}
