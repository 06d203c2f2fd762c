// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory [`LocalStore`] implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use absync_atom::{ContactRecord, LocalId, RemoteId};
use async_trait::async_trait;
use bimap::BiMap;
use jiff::Timestamp;
use uuid::Uuid;

use crate::store::{IdPair, ItemStatus, LocalStore, StoreError};

/// A [`LocalStore`] backed by process memory.
///
/// This is the reference store: it shows the id-map and tombstone
/// contract a platform-backed store has to honor, and it is what the
/// demos and tests run against. Clones share the same underlying data,
/// so a test can keep a handle while the engine owns another.
///
/// Contacts changed through [`insert`](MemoryStore::insert),
/// [`update`](MemoryStore::update) and [`remove`](MemoryStore::remove)
/// are stamped with the current time and show up in the delta listings;
/// [`seed`](MemoryStore::seed) plants records as already synced, with
/// timestamps at the epoch.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<LocalId, ContactRecord>,
    ids: BiMap<LocalId, RemoteId>,
    created: HashMap<LocalId, Timestamp>,
    modified: HashMap<LocalId, Timestamp>,
    tombstones: HashMap<LocalId, Tombstone>,
}

#[derive(Debug)]
struct Tombstone {
    remote_id: Option<RemoteId>,
    deleted_at: Timestamp,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Plants records as if a previous session had synced them: local
    /// ids are minted where missing, remote ids are registered, and the
    /// change timestamps sit at the epoch so nothing shows up as a
    /// local delta.
    pub fn seed(&self, records: Vec<ContactRecord>) -> Vec<LocalId> {
        let mut inner = self.lock();
        let mut ids = Vec::with_capacity(records.len());
        for mut record in records {
            let id = record
                .local_id
                .clone()
                .unwrap_or_else(|| LocalId::from(Uuid::new_v4().to_string()));
            if let Some(remote_id) = record.remote_id.clone() {
                inner.ids.insert(id.clone(), remote_id);
            }
            record.local_id = Some(id.clone());
            inner.created.insert(id.clone(), Timestamp::UNIX_EPOCH);
            inner.modified.insert(id.clone(), Timestamp::UNIX_EPOCH);
            inner.records.insert(id.clone(), record);
            ids.push(id);
        }
        ids
    }

    /// Stores a new contact the way an address book application would,
    /// stamped with the current time.
    pub fn insert(&self, mut record: ContactRecord) -> LocalId {
        let now = Timestamp::now();
        let mut inner = self.lock();
        let id = LocalId::from(Uuid::new_v4().to_string());
        if let Some(remote_id) = record.remote_id.clone() {
            inner.ids.insert(id.clone(), remote_id);
        }
        record.local_id = Some(id.clone());
        inner.created.insert(id.clone(), now);
        inner.modified.insert(id.clone(), now);
        inner.records.insert(id.clone(), record);
        id
    }

    /// Overwrites a contact, stamping it modified now.
    pub fn update(&self, id: &LocalId, mut record: ContactRecord) -> Result<(), StoreError> {
        let now = Timestamp::now();
        let mut inner = self.lock();
        if !inner.records.contains_key(id) {
            return Err(StoreError::NotFound(id.clone()));
        }
        if let Some(remote_id) = record.remote_id.clone() {
            inner.ids.insert(id.clone(), remote_id);
        }
        record.local_id = Some(id.clone());
        inner.modified.insert(id.clone(), now);
        inner.records.insert(id.clone(), record);
        Ok(())
    }

    /// Deletes a contact, leaving a tombstone stamped now.
    pub fn remove(&self, id: &LocalId) -> Result<(), StoreError> {
        let now = Timestamp::now();
        let mut inner = self.lock();
        if inner.records.remove(id).is_none() {
            return Err(StoreError::NotFound(id.clone()));
        }
        let remote_id = inner.ids.remove_by_left(id).map(|(_, remote)| remote);
        inner.created.remove(id);
        inner.modified.remove(id);
        inner.tombstones.insert(
            id.clone(),
            Tombstone {
                remote_id,
                deleted_at: now,
            },
        );
        Ok(())
    }

    /// Number of live contacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// Whether the store holds no live contacts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Synchronous clone of one contact, ids filled in. Handy in
    /// assertions where awaiting [`LocalStore::get`] is noise.
    #[must_use]
    pub fn record(&self, id: &LocalId) -> Option<ContactRecord> {
        let inner = self.lock();
        inner.records.get(id).map(|record| {
            let mut record = record.clone();
            record.local_id = Some(id.clone());
            record.remote_id = inner.ids.get_by_left(id).cloned();
            record
        })
    }

    /// Synchronous reverse lookup in the id map.
    #[must_use]
    pub fn lookup_remote(&self, remote_id: &RemoteId) -> Option<LocalId> {
        self.lock().ids.get_by_right(remote_id).cloned()
    }

    /// Number of tombstones currently held.
    #[must_use]
    pub fn tombstone_count(&self) -> usize {
        self.lock().tombstones.len()
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn all_ids(&self) -> Result<Vec<LocalId>, StoreError> {
        let mut ids: Vec<LocalId> = self.lock().records.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn added_since(&self, since: Timestamp) -> Result<Vec<IdPair>, StoreError> {
        let inner = self.lock();
        let mut pairs: Vec<IdPair> = inner
            .created
            .iter()
            .filter(|(_, stamp)| **stamp > since)
            .map(|(id, _)| IdPair {
                local_id: id.clone(),
                remote_id: inner.ids.get_by_left(id).cloned(),
            })
            .collect();
        pairs.sort_by(|a, b| a.local_id.cmp(&b.local_id));
        Ok(pairs)
    }

    async fn modified_since(&self, since: Timestamp) -> Result<Vec<IdPair>, StoreError> {
        let inner = self.lock();
        let mut pairs: Vec<IdPair> = inner
            .modified
            .iter()
            .filter(|(_, stamp)| **stamp > since)
            .filter(|(id, _)| inner.created.get(*id).is_none_or(|c| *c <= since))
            .map(|(id, _)| IdPair {
                local_id: id.clone(),
                remote_id: inner.ids.get_by_left(id).cloned(),
            })
            .collect();
        pairs.sort_by(|a, b| a.local_id.cmp(&b.local_id));
        Ok(pairs)
    }

    async fn deleted_since(&self, since: Timestamp) -> Result<Vec<IdPair>, StoreError> {
        let inner = self.lock();
        let mut pairs: Vec<IdPair> = inner
            .tombstones
            .iter()
            .filter(|(_, tomb)| tomb.deleted_at > since)
            .map(|(id, tomb)| IdPair {
                local_id: id.clone(),
                remote_id: tomb.remote_id.clone(),
            })
            .collect();
        pairs.sort_by(|a, b| a.local_id.cmp(&b.local_id));
        Ok(pairs)
    }

    async fn get(&self, id: &LocalId) -> Result<Option<ContactRecord>, StoreError> {
        Ok(self.record(id))
    }

    async fn batch_add(&self, records: Vec<ContactRecord>) -> Result<Vec<ItemStatus>, StoreError> {
        let now = Timestamp::now();
        let mut inner = self.lock();
        let mut statuses = Vec::with_capacity(records.len());
        for mut record in records {
            let id = LocalId::from(Uuid::new_v4().to_string());
            if let Some(remote_id) = record.remote_id.clone() {
                inner.ids.insert(id.clone(), remote_id);
            }
            record.local_id = Some(id.clone());
            inner.created.insert(id.clone(), now);
            inner.modified.insert(id.clone(), now);
            inner.records.insert(id, record);
            statuses.push(ItemStatus::Ok);
        }
        Ok(statuses)
    }

    async fn batch_modify(
        &self,
        records: Vec<ContactRecord>,
    ) -> Result<Vec<ItemStatus>, StoreError> {
        let now = Timestamp::now();
        let mut inner = self.lock();
        let mut statuses = Vec::with_capacity(records.len());
        for record in records {
            let Some(id) = record.local_id.clone() else {
                statuses.push(ItemStatus::Failed);
                continue;
            };
            if !inner.records.contains_key(&id) {
                statuses.push(ItemStatus::NotFound);
                continue;
            }
            if let Some(remote_id) = record.remote_id.clone() {
                inner.ids.insert(id.clone(), remote_id);
            }
            inner.modified.insert(id.clone(), now);
            inner.records.insert(id, record);
            statuses.push(ItemStatus::Ok);
        }
        Ok(statuses)
    }

    async fn batch_remove(&self, ids: Vec<LocalId>) -> Result<Vec<ItemStatus>, StoreError> {
        let now = Timestamp::now();
        let mut inner = self.lock();
        let mut statuses = Vec::with_capacity(ids.len());
        for id in ids {
            if inner.records.remove(&id).is_none() {
                statuses.push(ItemStatus::NotFound);
                continue;
            }
            let remote_id = inner.ids.remove_by_left(&id).map(|(_, remote)| remote);
            inner.created.remove(&id);
            inner.modified.remove(&id);
            inner.tombstones.insert(
                id,
                Tombstone {
                    remote_id,
                    deleted_at: now,
                },
            );
            statuses.push(ItemStatus::Ok);
        }
        Ok(statuses)
    }

    async fn local_id_of(&self, remote_id: &RemoteId) -> Result<Option<LocalId>, StoreError> {
        Ok(self.lookup_remote(remote_id))
    }

    async fn set_remote_id(
        &self,
        local_id: &LocalId,
        remote_id: &RemoteId,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.records.contains_key(local_id) {
            return Err(StoreError::NotFound(local_id.clone()));
        }
        inner.ids.insert(local_id.clone(), remote_id.clone());
        Ok(())
    }

    async fn purge_tombstones(&self) -> Result<(), StoreError> {
        self.lock().tombstones.clear();
        Ok(())
    }
}
