// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Test data factories for integration tests.
//!
//! This module provides helper functions to create contact records,
//! fetch pages and sync configurations for engine tests.

use absync_core::{
    ContactRecord, FetchPage, RemoteId, StructuredName, SyncConfig, SyncStatus, VersionTag,
};
use jiff::Timestamp;

/// Creates a contact record as it would arrive from the remote service:
/// remote id, version tag and a structured name.
#[must_use]
pub fn remote_contact(remote_id: &str, given: &str) -> ContactRecord {
    let mut record = ContactRecord::new();
    record.remote_id = Some(RemoteId::from(remote_id));
    record.etag = Some(VersionTag::from("\"etag-1\""));
    record.updated = Some(Timestamp::now());
    record.name = Some(StructuredName {
        given: Some(given.to_string()),
        ..Default::default()
    });
    record
}

/// Creates a contact record as an address book application would store
/// it: payload only, no ids.
#[must_use]
pub fn local_contact(given: &str) -> ContactRecord {
    let mut record = ContactRecord::new();
    record.name = Some(StructuredName {
        given: Some(given.to_string()),
        ..Default::default()
    });
    record
}

/// Creates a remote deletion marker.
#[must_use]
pub fn remote_tombstone(remote_id: &str) -> ContactRecord {
    ContactRecord::tombstone(RemoteId::from(remote_id), Timestamp::now())
}

/// Wraps records into one fetch page with the given status.
#[must_use]
pub fn page(records: Vec<ContactRecord>, status: SyncStatus) -> FetchPage {
    FetchPage { records, status }
}

/// Creates a config with no recorded last sync, so the session runs as
/// a slow sync.
#[must_use]
pub fn slow_config() -> SyncConfig {
    let mut config = SyncConfig::new("addressbook", "user@example.com");
    config.auth_token = "test-token".to_string();
    config
}

/// Creates a config whose last sync lies an hour in the past, so the
/// session runs as a fast sync and current-time changes land inside the
/// delta window.
#[must_use]
pub fn fast_config() -> SyncConfig {
    let mut config = slow_config();
    config.last_sync = Some(Timestamp::now() - jiff::Span::new().hours(1));
    config
}
