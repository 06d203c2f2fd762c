// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Sessions that do not finish cleanly: failures and aborts.

use absync_core::{FetchPage, MemoryStore, RemoteId, SyncEngine, SyncPhase, SyncStatus};

use crate::common::{MockSource, local_contact, page, remote_contact, slow_config};

#[tokio::test]
async fn rejected_session_reports_auth_failure() {
    // Arrange
    let store = MemoryStore::new();
    let source = MockSource::new();
    source.fail_init(SyncStatus::AuthFailure);
    let mut engine = SyncEngine::new(store.clone(), source.clone(), slow_config());
    let phases = engine.phase_watch();

    // Act
    let status = engine.start().await;

    // Assert - nothing ran, but the report still exists
    assert_eq!(status, SyncStatus::AuthFailure);
    assert_eq!(*phases.borrow(), SyncPhase::Error);
    assert_eq!(source.transactions(), 0);
    let report = engine.result().unwrap();
    assert_eq!(report.status, SyncStatus::AuthFailure);
    assert!(!report.is_success());
    assert_eq!(report.local.total() + report.remote.total(), 0);
}

#[tokio::test]
async fn empty_token_fails_the_session_early() {
    // Arrange
    let store = MemoryStore::new();
    let source = MockSource::new();
    let mut config = slow_config();
    config.auth_token = String::new();
    let mut engine = SyncEngine::new(store, source.clone(), config);

    // Act
    let status = engine.start().await;

    // Assert
    assert_eq!(status, SyncStatus::AuthFailure);
    assert!(source.queries().is_empty());
}

#[tokio::test]
async fn fetch_failure_stops_the_session_before_the_push() {
    // Arrange - one good page, then a server failure
    let store = MemoryStore::new();
    let source = MockSource::new();
    source.push_page(page(vec![remote_contact("r1", "Ada")], SyncStatus::InProgress));
    source.push_page(FetchPage::status_only(SyncStatus::ServerFailure));
    source.finish_fetch_with(SyncStatus::ServerFailure);
    let mut engine = SyncEngine::new(store.clone(), source.clone(), slow_config());

    // Act
    let status = engine.start().await;

    // Assert - the first page landed, nothing was pushed
    assert_eq!(status, SyncStatus::ServerFailure);
    assert_eq!(store.len(), 1);
    assert_eq!(source.transactions(), 0);
    let report = engine.result().unwrap();
    assert_eq!(report.status, SyncStatus::ServerFailure);
    assert_eq!(report.local.added, 1);
}

#[tokio::test]
async fn commit_failure_leaves_remote_ids_unassigned() {
    // Arrange
    let store = MemoryStore::new();
    let ada = store.insert(local_contact("Ada"));
    let source = MockSource::new();
    source.fail_commit(SyncStatus::ConnectionError);
    let mut engine = SyncEngine::new(store.clone(), source.clone(), slow_config());

    // Act
    let status = engine.start().await;

    // Assert - no write-back happened, the next session retries the push
    assert_eq!(status, SyncStatus::ConnectionError);
    assert!(store.record(&ada).unwrap().remote_id.is_none());
    let report = engine.result().unwrap();
    assert_eq!(report.remote.total(), 0);
}

#[tokio::test]
async fn partial_commit_keeps_the_committed_pages() {
    // Arrange - two one-op pages, the second one never commits
    let store = MemoryStore::new();
    let ada = store.insert(local_contact("Ada"));
    let brendan = store.insert(local_contact("Brendan"));
    let source = MockSource::new();
    source.set_page_size(1);
    source.fail_commit_after_pages(1, SyncStatus::ConnectionError);
    let mut engine = SyncEngine::new(store.clone(), source.clone(), slow_config());

    // Act
    let status = engine.start().await;

    // Assert - the committed page's remote id landed, only the other
    // push is retried next session
    assert_eq!(status, SyncStatus::ConnectionError);
    assert_eq!(source.commit_page_sizes(), vec![1]);
    let pushed = [ada, brendan]
        .into_iter()
        .filter(|id| store.record(id).unwrap().remote_id.is_some())
        .count();
    assert_eq!(pushed, 1);
    let report = engine.result().unwrap();
    assert_eq!(report.status, SyncStatus::ConnectionError);
    assert_eq!(report.remote.added, 1);
}

#[tokio::test]
async fn abort_raised_before_the_session_stops_it_early() {
    // Arrange
    let store = MemoryStore::new();
    let source = MockSource::new();
    source.push_page(page(vec![remote_contact("r1", "Ada")], SyncStatus::Done));
    let mut engine = SyncEngine::new(store.clone(), source.clone(), slow_config());
    let phases = engine.phase_watch();
    engine.abort_handle().raise();

    // Act
    let status = engine.start().await;

    // Assert
    assert_eq!(status, SyncStatus::Aborted);
    assert_eq!(*phases.borrow(), SyncPhase::Aborted);
    assert!(store.is_empty());
    assert_eq!(source.transactions(), 0);
}

#[tokio::test]
async fn abort_between_fetch_pages_keeps_the_finished_work() {
    // Arrange - the abort lands after the first page is out
    let store = MemoryStore::new();
    let source = MockSource::new();
    source.push_page(page(vec![remote_contact("r1", "Ada")], SyncStatus::InProgress));
    source.push_page(page(vec![remote_contact("r2", "Brendan")], SyncStatus::Done));
    source.abort_after_first_page();
    let mut engine = SyncEngine::new(store.clone(), source.clone(), slow_config());

    // Act
    let status = engine.start().await;

    // Assert - the first page was applied, the second never arrived
    assert_eq!(status, SyncStatus::Aborted);
    assert_eq!(store.len(), 1);
    assert!(store.lookup_remote(&RemoteId::from("r1")).is_some());
    assert!(store.lookup_remote(&RemoteId::from("r2")).is_none());
    assert_eq!(source.transactions(), 0);
    let report = engine.result().unwrap();
    assert_eq!(report.status, SyncStatus::Aborted);
    assert_eq!(report.local.added, 1);
}
