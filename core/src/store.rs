// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The local contacts repository seam.

use absync_atom::{ContactRecord, LocalId, RemoteId};
use async_trait::async_trait;
use jiff::Timestamp;
use thiserror::Error;

/// Local store failure.
///
/// Anything the engine cannot recover from: it terminates the session
/// with a database-failure status.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store has no record under this id.
    #[error("contact not found: {0}")]
    NotFound(LocalId),

    /// The underlying storage backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Per-record result of a batch store operation.
///
/// Batch operations report one status per input index instead of
/// failing the whole batch on the first bad record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    /// The operation applied to this record.
    Ok,
    /// The record the operation named does not exist.
    NotFound,
    /// The store rejected this record.
    Failed,
}

/// A local id together with the remote id it is known under, if any.
///
/// Change listings come back as pairs: the local id addresses the store,
/// the remote id joins the record against the remote delta. A pair
/// without a remote id belongs to a contact that has never been synced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdPair {
    /// Identifier in the local store.
    pub local_id: LocalId,
    /// Identifier on the remote service, when the contact has one.
    pub remote_id: Option<RemoteId>,
}

/// The local contacts repository.
///
/// The engine is generic over this trait; an implementation wraps
/// whatever address book the host platform has. All mutating operations
/// are batched with per-index statuses, mirroring how platform contact
/// APIs behave.
///
/// Implementations must keep a persistent local↔remote id map: records
/// stored through [`batch_add`](LocalStore::batch_add) or
/// [`batch_modify`](LocalStore::batch_modify) that carry a remote id
/// register it, and [`set_remote_id`](LocalStore::set_remote_id)
/// registers one explicitly. Deletions must leave a tombstone carrying
/// the remote id until [`purge_tombstones`](LocalStore::purge_tombstones)
/// runs, so the next delta can still report them.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Lists the ids of all live contacts.
    async fn all_ids(&self) -> Result<Vec<LocalId>, StoreError>;

    /// Lists contacts created strictly after `since`.
    async fn added_since(&self, since: Timestamp) -> Result<Vec<IdPair>, StoreError>;

    /// Lists contacts modified strictly after `since`, excluding ones
    /// also created after it.
    async fn modified_since(&self, since: Timestamp) -> Result<Vec<IdPair>, StoreError>;

    /// Lists contacts deleted strictly after `since`.
    async fn deleted_since(&self, since: Timestamp) -> Result<Vec<IdPair>, StoreError>;

    /// Loads one contact.
    async fn get(&self, id: &LocalId) -> Result<Option<ContactRecord>, StoreError>;

    /// Stores new contacts, minting local ids for records that have
    /// none. Records carrying a remote id register it in the id map.
    async fn batch_add(&self, records: Vec<ContactRecord>) -> Result<Vec<ItemStatus>, StoreError>;

    /// Overwrites existing contacts, addressed by their `local_id`.
    /// Records carrying a remote id refresh the id map.
    async fn batch_modify(
        &self,
        records: Vec<ContactRecord>,
    ) -> Result<Vec<ItemStatus>, StoreError>;

    /// Deletes contacts, leaving tombstones behind.
    async fn batch_remove(&self, ids: Vec<LocalId>) -> Result<Vec<ItemStatus>, StoreError>;

    /// Looks up the local id a remote id maps to.
    async fn local_id_of(&self, remote_id: &RemoteId) -> Result<Option<LocalId>, StoreError>;

    /// Registers a remote id for a locally stored contact.
    async fn set_remote_id(
        &self,
        local_id: &LocalId,
        remote_id: &RemoteId,
    ) -> Result<(), StoreError>;

    /// Drops all tombstones. Called once a session finishes cleanly;
    /// the deletions they described have been pushed.
    async fn purge_tombstones(&self) -> Result<(), StoreError>;
}
