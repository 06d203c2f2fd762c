// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Slow sync (first run) sessions: the full two-sided exchange.

use absync_core::{MemoryStore, RemoteId, SyncEngine, SyncPhase, SyncStatus, VersionTag};

use crate::common::{MockSource, local_contact, page, remote_contact, slow_config};

#[tokio::test]
async fn slow_sync_stores_every_remote_contact() {
    // Arrange
    let store = MemoryStore::new();
    let source = MockSource::new();
    source.push_page(page(
        vec![remote_contact("r1", "Ada"), remote_contact("r2", "Brendan")],
        SyncStatus::InProgress,
    ));
    source.push_page(page(vec![remote_contact("r3", "Grace")], SyncStatus::Done));
    let mut engine = SyncEngine::new(store.clone(), source.clone(), slow_config());

    // Act
    let status = engine.start().await;

    // Assert - everything fetched landed locally
    assert_eq!(status, SyncStatus::Done);
    assert_eq!(store.len(), 3);
    for remote in ["r1", "r2", "r3"] {
        assert!(store.lookup_remote(&RemoteId::from(remote)).is_some());
    }

    // Assert - the report counts the local adds and nothing else
    let report = engine.result().unwrap();
    assert_eq!(report.local.added, 3);
    assert_eq!(report.local.total(), 3);
    assert_eq!(report.remote.total(), 0);
    assert!(report.is_success());
}

#[tokio::test]
async fn slow_sync_pushes_the_local_snapshot_as_creates() {
    // Arrange
    let store = MemoryStore::new();
    let ada = store.insert(local_contact("Ada"));
    let brendan = store.insert(local_contact("Brendan"));
    let source = MockSource::new();
    let mut engine = SyncEngine::new(store.clone(), source.clone(), slow_config());

    // Act
    let status = engine.start().await;

    // Assert - both went up as creates in one transaction
    assert_eq!(status, SyncStatus::Done);
    assert_eq!(source.transactions(), 1);
    assert_eq!(source.saved_creates().len(), 2);
    assert!(source.saved_updates().is_empty());
    assert_eq!(engine.result().unwrap().remote.added, 2);

    // Assert - minted remote ids and fresh version tags were written back
    for id in [&ada, &brendan] {
        let record = store.record(id).unwrap();
        assert_eq!(record.remote_id, Some(RemoteId::from(format!("mock-{id}"))));
        assert_eq!(record.etag, Some(VersionTag::from("\"fresh-1\"")));
    }
}

#[tokio::test]
async fn slow_sync_does_not_echo_fetched_contacts_back() {
    // Arrange
    let store = MemoryStore::new();
    let source = MockSource::new();
    source.push_page(page(vec![remote_contact("r1", "Ada")], SyncStatus::Done));
    let mut engine = SyncEngine::new(store.clone(), source.clone(), slow_config());

    // Act
    let status = engine.start().await;

    // Assert - the record came down but was not pushed straight back up
    assert_eq!(status, SyncStatus::Done);
    assert_eq!(store.len(), 1);
    assert!(source.saved().is_empty());
    let report = engine.result().unwrap();
    assert_eq!(report.local.added, 1);
    assert_eq!(report.remote.total(), 0);
}

#[tokio::test]
async fn slow_sync_updates_contacts_already_known_by_remote_id() {
    // Arrange
    let store = MemoryStore::new();
    store.seed(vec![{
        let mut record = local_contact("Ada");
        record.remote_id = Some(RemoteId::from("r1"));
        record
    }]);
    let source = MockSource::new();
    source.push_page(page(vec![remote_contact("r1", "Ada")], SyncStatus::Done));
    let mut engine = SyncEngine::new(store.clone(), source.clone(), slow_config());

    // Act
    let status = engine.start().await;

    // Assert - no duplicate locally, one update remotely
    assert_eq!(status, SyncStatus::Done);
    assert_eq!(store.len(), 1);
    assert_eq!(source.saved_updates().len(), 1);
    let report = engine.result().unwrap();
    assert_eq!(report.local.added, 0);
    assert_eq!(report.remote.modified, 1);
}

#[tokio::test]
async fn phases_return_to_idle_after_a_clean_session() {
    // Arrange
    let store = MemoryStore::new();
    let source = MockSource::new();
    let mut engine = SyncEngine::new(store, source, slow_config());
    let phases = engine.phase_watch();
    assert_eq!(*phases.borrow(), SyncPhase::Idle);

    // Act
    let status = engine.start().await;

    // Assert
    assert_eq!(status, SyncStatus::Done);
    assert_eq!(*phases.borrow(), SyncPhase::Idle);
}
