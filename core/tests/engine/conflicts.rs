// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Fast sync sessions where both sides changed the same contact.

use absync_core::{
    ConflictPolicy, ContactRecord, MemoryStore, RemoteId, SyncConfig, SyncEngine, SyncStatus,
    VersionTag,
};

use crate::common::{MockSource, fast_config, local_contact, page, remote_contact, remote_tombstone};

fn seeded(remote_id: &str, given: &str) -> ContactRecord {
    let mut record = local_contact(given);
    record.remote_id = Some(RemoteId::from(remote_id));
    record.etag = Some(VersionTag::from("\"etag-0\""));
    record
}

fn config_with(policy: ConflictPolicy) -> SyncConfig {
    let mut config = fast_config();
    config.conflict_policy = policy;
    config
}

#[tokio::test]
async fn both_modified_server_wins_keeps_the_remote_copy() {
    // Arrange - the same contact changed on both sides
    let store = MemoryStore::new();
    let ids = store.seed(vec![seeded("r1", "Ada")]);
    store.update(&ids[0], seeded("r1", "Ada Local")).unwrap();
    let source = MockSource::new();
    source.push_page(page(vec![remote_contact("r1", "Ada Remote")], SyncStatus::Done));
    let mut engine = SyncEngine::new(
        store.clone(),
        source.clone(),
        config_with(ConflictPolicy::ServerWins),
    );

    // Act
    let status = engine.start().await;

    // Assert - the remote copy landed, the local change never went up
    assert_eq!(status, SyncStatus::Done);
    assert_eq!(store.record(&ids[0]).unwrap().display_name(), "Ada Remote");
    assert!(source.saved().is_empty());
    let report = engine.result().unwrap();
    assert_eq!(report.local.modified, 1);
    assert_eq!(report.remote.total(), 0);
}

#[tokio::test]
async fn both_modified_client_wins_pushes_the_local_copy() {
    // Arrange
    let store = MemoryStore::new();
    let ids = store.seed(vec![seeded("r1", "Ada")]);
    store.update(&ids[0], seeded("r1", "Ada Local")).unwrap();
    let source = MockSource::new();
    source.push_page(page(vec![remote_contact("r1", "Ada Remote")], SyncStatus::Done));
    let mut engine = SyncEngine::new(
        store.clone(),
        source.clone(),
        config_with(ConflictPolicy::ClientWins),
    );

    // Act
    let status = engine.start().await;

    // Assert - the remote copy was discarded, the local one went up
    assert_eq!(status, SyncStatus::Done);
    assert_eq!(store.record(&ids[0]).unwrap().display_name(), "Ada Local");
    assert_eq!(source.saved_updates().len(), 1);
    let report = engine.result().unwrap();
    assert_eq!(report.local.total(), 0);
    assert_eq!(report.remote.modified, 1);
}

#[tokio::test]
async fn remote_delete_beats_local_modification_under_server_wins() {
    // Arrange - modified here, deleted there
    let store = MemoryStore::new();
    let ids = store.seed(vec![seeded("r1", "Ada")]);
    store.update(&ids[0], seeded("r1", "Ada Local")).unwrap();
    let source = MockSource::new();
    source.push_page(page(vec![remote_tombstone("r1")], SyncStatus::Done));
    let mut engine = SyncEngine::new(
        store.clone(),
        source.clone(),
        config_with(ConflictPolicy::ServerWins),
    );

    // Act
    let status = engine.start().await;

    // Assert - deleted locally, and the stale update was never pushed
    assert_eq!(status, SyncStatus::Done);
    assert_eq!(store.len(), 0);
    assert!(source.saved().is_empty());
    assert!(source.removed().is_empty());
    let report = engine.result().unwrap();
    assert_eq!(report.local.deleted, 1);
    assert_eq!(report.remote.total(), 0);
}

#[tokio::test]
async fn local_modification_beats_remote_delete_under_client_wins() {
    // Arrange
    let store = MemoryStore::new();
    let ids = store.seed(vec![seeded("r1", "Ada")]);
    store.update(&ids[0], seeded("r1", "Ada Local")).unwrap();
    let source = MockSource::new();
    source.push_page(page(vec![remote_tombstone("r1")], SyncStatus::Done));
    let mut engine = SyncEngine::new(
        store.clone(),
        source.clone(),
        config_with(ConflictPolicy::ClientWins),
    );

    // Act
    let status = engine.start().await;

    // Assert - the contact survives locally and goes up as an update
    assert_eq!(status, SyncStatus::Done);
    assert_eq!(store.len(), 1);
    assert_eq!(source.saved_updates().len(), 1);
    let report = engine.result().unwrap();
    assert_eq!(report.local.deleted, 0);
    assert_eq!(report.remote.modified, 1);
}

#[tokio::test]
async fn remote_modification_resurrects_a_local_delete_under_server_wins() {
    // Arrange - deleted here, modified there
    let store = MemoryStore::new();
    let ids = store.seed(vec![seeded("r1", "Ada")]);
    store.remove(&ids[0]).unwrap();
    let source = MockSource::new();
    source.push_page(page(vec![remote_contact("r1", "Ada Remote")], SyncStatus::Done));
    let mut engine = SyncEngine::new(
        store.clone(),
        source.clone(),
        config_with(ConflictPolicy::ServerWins),
    );

    // Act
    let status = engine.start().await;

    // Assert - the contact is back locally, no delete went up
    assert_eq!(status, SyncStatus::Done);
    assert_eq!(store.len(), 1);
    assert!(store.lookup_remote(&RemoteId::from("r1")).is_some());
    assert!(source.removed().is_empty());
    let report = engine.result().unwrap();
    assert_eq!(report.local.added, 1);
    assert_eq!(report.remote.total(), 0);
}

#[tokio::test]
async fn local_delete_beats_remote_modification_under_client_wins() {
    // Arrange
    let store = MemoryStore::new();
    let ids = store.seed(vec![seeded("r1", "Ada")]);
    store.remove(&ids[0]).unwrap();
    let source = MockSource::new();
    source.push_page(page(vec![remote_contact("r1", "Ada Remote")], SyncStatus::Done));
    let mut engine = SyncEngine::new(
        store.clone(),
        source.clone(),
        config_with(ConflictPolicy::ClientWins),
    );

    // Act
    let status = engine.start().await;

    // Assert - the remote copy was discarded and the delete went up
    assert_eq!(status, SyncStatus::Done);
    assert_eq!(store.len(), 0);
    let removed = source.removed();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].remote_id, Some(RemoteId::from("r1")));
    let report = engine.result().unwrap();
    assert_eq!(report.local.total(), 0);
    assert_eq!(report.remote.deleted, 1);
}

#[tokio::test]
async fn contact_deleted_on_both_sides_needs_no_operation() {
    // Arrange
    for policy in [ConflictPolicy::ServerWins, ConflictPolicy::ClientWins] {
        let store = MemoryStore::new();
        let ids = store.seed(vec![seeded("r1", "Ada")]);
        store.remove(&ids[0]).unwrap();
        let source = MockSource::new();
        source.push_page(page(vec![remote_tombstone("r1")], SyncStatus::Done));
        let mut engine = SyncEngine::new(store.clone(), source.clone(), config_with(policy));

        // Act
        let status = engine.start().await;

        // Assert - both tombstones cancelled out
        assert_eq!(status, SyncStatus::Done);
        assert!(source.removed().is_empty());
        let report = engine.result().unwrap();
        assert_eq!(report.local.total(), 0);
        assert_eq!(report.remote.total(), 0);
        assert_eq!(store.tombstone_count(), 0);
    }
}
