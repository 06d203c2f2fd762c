// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Fast sync (delta) sessions without conflicts.

use absync_core::{MemoryStore, RemoteId, SyncEngine, SyncStatus, VersionTag};

use crate::common::{
    MockSource, fast_config, local_contact, page, remote_contact, remote_tombstone,
};

fn seeded(remote_id: &str, given: &str) -> absync_core::ContactRecord {
    let mut record = local_contact(given);
    record.remote_id = Some(RemoteId::from(remote_id));
    record.etag = Some(VersionTag::from("\"etag-0\""));
    record
}

#[tokio::test]
async fn fast_sync_queries_the_padded_delta_window() {
    // Arrange
    let store = MemoryStore::new();
    let source = MockSource::new();
    let config = fast_config();
    let mut engine = SyncEngine::new(store, source.clone(), config.clone());

    // Act
    let status = engine.start().await;

    // Assert - one delta query, padded past the recorded finish time,
    // tombstones included
    assert_eq!(status, SyncStatus::Done);
    let queries = source.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].updated_since, config.since());
    assert!(queries[0].include_deleted);
}

#[tokio::test]
async fn fast_sync_pushes_a_local_modification_as_one_update() {
    // Arrange
    let store = MemoryStore::new();
    let ids = store.seed(vec![seeded("r1", "Ada")]);
    store.update(&ids[0], seeded("r1", "Ada Lovelace")).unwrap();
    let source = MockSource::new();
    let mut engine = SyncEngine::new(store.clone(), source.clone(), fast_config());

    // Act
    let status = engine.start().await;

    // Assert - exactly one update went up, nothing else
    assert_eq!(status, SyncStatus::Done);
    assert_eq!(source.saved_updates().len(), 1);
    assert!(source.saved_creates().is_empty());
    assert!(source.removed().is_empty());
    let report = engine.result().unwrap();
    assert_eq!(report.remote.modified, 1);
    assert_eq!(report.remote.total(), 1);
    assert_eq!(report.local.total(), 0);

    // Assert - the fresh version tag was written back
    let record = store.record(&ids[0]).unwrap();
    assert_eq!(record.etag, Some(VersionTag::from("\"fresh-2\"")));
}

#[tokio::test]
async fn fast_sync_pushes_a_local_addition_as_one_create() {
    // Arrange
    let store = MemoryStore::new();
    store.seed(vec![seeded("r1", "Ada")]);
    let grace = store.insert(local_contact("Grace"));
    let source = MockSource::new();
    let mut engine = SyncEngine::new(store.clone(), source.clone(), fast_config());

    // Act
    let status = engine.start().await;

    // Assert
    assert_eq!(status, SyncStatus::Done);
    assert_eq!(source.saved_creates().len(), 1);
    assert!(source.saved_updates().is_empty());
    assert_eq!(engine.result().unwrap().remote.added, 1);
    let record = store.record(&grace).unwrap();
    assert_eq!(
        record.remote_id,
        Some(RemoteId::from(format!("mock-{grace}")))
    );
}

#[tokio::test]
async fn fast_sync_pushes_local_deletions() {
    // Arrange
    let store = MemoryStore::new();
    let ids = store.seed(vec![seeded("r1", "Ada")]);
    store.remove(&ids[0]).unwrap();
    let source = MockSource::new();
    let mut engine = SyncEngine::new(store.clone(), source.clone(), fast_config());

    // Act
    let status = engine.start().await;

    // Assert - the delete went up and the tombstone is gone
    assert_eq!(status, SyncStatus::Done);
    let removed = source.removed();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].remote_id, Some(RemoteId::from("r1")));
    assert_eq!(engine.result().unwrap().remote.deleted, 1);
    assert_eq!(store.tombstone_count(), 0);
}

#[tokio::test]
async fn fast_sync_stores_remote_additions() {
    // Arrange
    let store = MemoryStore::new();
    store.seed(vec![seeded("r1", "Ada")]);
    let source = MockSource::new();
    source.push_page(page(vec![remote_contact("r9", "Grace")], SyncStatus::Done));
    let mut engine = SyncEngine::new(store.clone(), source.clone(), fast_config());

    // Act
    let status = engine.start().await;

    // Assert
    assert_eq!(status, SyncStatus::Done);
    assert_eq!(store.len(), 2);
    assert!(store.lookup_remote(&RemoteId::from("r9")).is_some());
    assert_eq!(engine.result().unwrap().local.added, 1);
    assert!(source.saved().is_empty());
}

#[tokio::test]
async fn fast_sync_applies_remote_modifications_locally() {
    // Arrange
    let store = MemoryStore::new();
    let ids = store.seed(vec![seeded("r1", "Ada")]);
    let source = MockSource::new();
    source.push_page(page(
        vec![remote_contact("r1", "Ada Lovelace")],
        SyncStatus::Done,
    ));
    let mut engine = SyncEngine::new(store.clone(), source.clone(), fast_config());

    // Act
    let status = engine.start().await;

    // Assert - applied in place, nothing pushed
    assert_eq!(status, SyncStatus::Done);
    assert_eq!(store.len(), 1);
    assert_eq!(store.record(&ids[0]).unwrap().display_name(), "Ada Lovelace");
    assert_eq!(engine.result().unwrap().local.modified, 1);
    assert!(source.saved().is_empty());
}

#[tokio::test]
async fn fast_sync_applies_remote_tombstones_locally() {
    // Arrange
    let store = MemoryStore::new();
    store.seed(vec![seeded("r1", "Ada"), seeded("r2", "Brendan")]);
    let source = MockSource::new();
    source.push_page(page(vec![remote_tombstone("r2")], SyncStatus::Done));
    let mut engine = SyncEngine::new(store.clone(), source.clone(), fast_config());

    // Act
    let status = engine.start().await;

    // Assert
    assert_eq!(status, SyncStatus::Done);
    assert_eq!(store.len(), 1);
    assert!(store.lookup_remote(&RemoteId::from("r2")).is_none());
    let report = engine.result().unwrap();
    assert_eq!(report.local.deleted, 1);
    assert_eq!(report.remote.total(), 0);
}

#[tokio::test]
async fn modified_contact_that_never_synced_goes_up_as_a_create() {
    // Arrange - seeded without a remote id, then changed
    let store = MemoryStore::new();
    let ids = store.seed(vec![local_contact("Ada")]);
    store.update(&ids[0], local_contact("Ada Lovelace")).unwrap();
    let source = MockSource::new();
    let mut engine = SyncEngine::new(store.clone(), source.clone(), fast_config());

    // Act
    let status = engine.start().await;

    // Assert - it cannot be an update, there is nothing to update yet
    assert_eq!(status, SyncStatus::Done);
    assert_eq!(source.saved_creates().len(), 1);
    assert!(source.saved_updates().is_empty());
    assert_eq!(engine.result().unwrap().remote.added, 1);
    assert!(store.record(&ids[0]).unwrap().remote_id.is_some());
}

#[tokio::test]
async fn fast_sync_without_changes_reports_zero_counts() {
    // Arrange
    let store = MemoryStore::new();
    store.seed(vec![seeded("r1", "Ada")]);
    let source = MockSource::new();
    let mut engine = SyncEngine::new(store.clone(), source.clone(), fast_config());

    // Act
    let status = engine.start().await;

    // Assert - a quiet session still finishes cleanly
    assert_eq!(status, SyncStatus::Done);
    let report = engine.result().unwrap();
    assert_eq!(report.local.total(), 0);
    assert_eq!(report.remote.total(), 0);
    assert!(source.commit_page_sizes().is_empty());
    assert_eq!(source.commits(), 1);
}
