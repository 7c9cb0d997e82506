//! Contract Test: Batch Orchestration
//!
//! Constraints verified:
//! - Devices are deduplicated by id, the later name wins
//! - Unresolved devices never reach the store and never appear in the log
//! - Missing records are created with exactly one create call
//! - Matching records cause zero mutations
//! - The action log follows batch order

mod common;

use common::*;
use devdns_core::traits::RecordStore;
use devdns_core::{ActionKind, MemoryZone, Observation, ObservationSet};

#[tokio::test]
async fn later_name_wins_for_repeated_device() {
    let store = RecordingStore::empty();
    let directory = CountingDirectory::new(&[("d1", ip(3))]);
    let (orchestrator, _events) = orchestrator_for(&store, &directory, &test_config());

    let report = orchestrator
        .run(vec![
            Observation::new("d1", "old-name"),
            Observation::new("d1", "new-name"),
        ])
        .await;

    assert_eq!(report.actions.len(), 1);
    assert_eq!(report.actions[0].name, "new-name.example.com");
    assert_eq!(directory.lookup_count(), 1, "one lookup per unique device");
    assert!(
        store
            .zone()
            .find_record_by_name("old-name.example.com")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn unresolved_device_is_silently_excluded() {
    let store = RecordingStore::empty();
    let directory = CountingDirectory::new(&[]);
    let (orchestrator, _events) = orchestrator_for(&store, &directory, &test_config());

    let report = orchestrator.run(vec![Observation::new("ghost", "ghost")]).await;

    assert!(report.actions.is_empty());
    assert_eq!(report.unresolved, 1);
    assert_eq!(report.failed, 0);
    assert!(store.calls().is_empty(), "no store call for an unresolved device");
}

#[tokio::test]
async fn missing_record_is_created_once() {
    let store = RecordingStore::empty();
    let directory = CountingDirectory::new(&[("d1", ip(4))]);
    let (orchestrator, _events) = orchestrator_for(&store, &directory, &test_config());

    let report = orchestrator.run(vec![Observation::new("d1", "printer")]).await;

    assert_eq!(report.actions.len(), 1);
    assert_eq!(report.actions[0].kind, ActionKind::Created);
    assert_eq!(report.actions[0].name, "printer.example.com");
    assert_eq!(report.actions[0].address, ip(4));
    assert_eq!(
        store.mutations(),
        vec![StoreCall::Create("printer.example.com".to_string(), ip(4))]
    );
}

#[tokio::test]
async fn matching_record_causes_no_mutation() {
    let zone = MemoryZone::with_records([("printer.example.com", ip(4))]);
    let store = RecordingStore::new(zone);
    let directory = CountingDirectory::new(&[("d1", ip(4))]);
    let (orchestrator, _events) = orchestrator_for(&store, &directory, &test_config());

    let report = orchestrator.run(vec![Observation::new("d1", "printer")]).await;

    assert_eq!(report.actions.len(), 1);
    assert_eq!(report.actions[0].kind, ActionKind::NoChange);
    assert!(store.mutations().is_empty());
}

#[tokio::test]
async fn action_log_follows_batch_order() {
    let zone = MemoryZone::with_records([("beta.example.com", ip(2))]);
    let store = RecordingStore::new(zone);
    let directory = CountingDirectory::new(&[("d1", ip(1)), ("d2", ip(2)), ("d3", ip(3))]);
    let (orchestrator, _events) = orchestrator_for(&store, &directory, &test_config());

    let set: ObservationSet = vec![
        Observation::new("d3", "gamma"),
        Observation::new("d1", "alpha"),
        Observation::new("dx", "unknown"),
        Observation::new("d2", "beta"),
    ]
    .into_iter()
    .collect();

    let report = orchestrator.run_set(&set).await;

    let summary: Vec<(&str, ActionKind)> = report
        .actions
        .iter()
        .map(|a| (a.name.as_str(), a.kind))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("gamma.example.com", ActionKind::Created),
            ("alpha.example.com", ActionKind::Created),
            ("beta.example.com", ActionKind::NoChange),
        ]
    );
    assert_eq!(report.unresolved, 1);
    assert_eq!(directory.looked_up(), vec!["d3", "d1", "dx", "d2"]);
}
