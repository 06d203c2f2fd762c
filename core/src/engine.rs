// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The sync orchestrator.

use std::fmt;

use absync_atom::{ContactRecord, LocalId, RemoteId};
use jiff::Timestamp;
use tokio::sync::{mpsc, watch};

use crate::abort::AbortFlag;
use crate::report::SyncReport;
use crate::session::{ConflictPolicy, SessionState, SyncConfig, SyncMode};
use crate::source::{CommitOutcome, FetchPage, FetchQuery, RemoteSource, SourceSession};
use crate::status::SyncStatus;
use crate::store::{ItemStatus, LocalStore, StoreError};

/// Phase a session is currently in.
///
/// Phases move `Idle → Authenticating → FetchingRemote → Reconciling →
/// PushingRemote → Finalizing → Idle`; a failed session parks in
/// `Error`, a cancelled one in `Aborted`. Observable through
/// [`SyncEngine::phase_watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No session running.
    Idle,
    /// Binding the source to the session credentials.
    Authenticating,
    /// Fetching remote pages (and applying them as they arrive).
    FetchingRemote,
    /// Assembling the local push set.
    Reconciling,
    /// Committing the push set to the remote service.
    PushingRemote,
    /// Purging tombstones and building the report.
    Finalizing,
    /// The last session was cancelled.
    Aborted,
    /// The last session failed.
    Error,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Idle => "idle",
            Self::Authenticating => "authenticating",
            Self::FetchingRemote => "fetching remote",
            Self::Reconciling => "reconciling",
            Self::PushingRemote => "pushing remote",
            Self::Finalizing => "finalizing",
            Self::Aborted => "aborted",
            Self::Error => "error",
        };
        text.fmt(f)
    }
}

/// Two-way sync session driver, generic over the local store and the
/// remote source.
///
/// One engine runs one session at a time. Without a recorded last-sync
/// time the session is a slow sync (full exchange); with one it is a
/// fast sync over both sides' deltas. On success the caller should
/// record the report's finish time as the next session's
/// [`SyncConfig::last_sync`].
///
/// Remote mutations are not transactional across the whole session: a
/// local store failure after the commit leaves the pushed changes in
/// place, and the next slow sync reconverges.
#[derive(Debug)]
pub struct SyncEngine<S, R> {
    store: S,
    source: R,
    config: SyncConfig,
    abort: AbortFlag,
    phase: watch::Sender<SyncPhase>,
    state: SessionState,
    report: Option<SyncReport>,
}

impl<S: LocalStore, R: RemoteSource> SyncEngine<S, R> {
    /// Creates an engine for one target.
    pub fn new(store: S, source: R, config: SyncConfig) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            store,
            source,
            config,
            abort: AbortFlag::new(),
            phase,
            state: SessionState::default(),
            report: None,
        }
    }

    /// The cancellation flag for this engine.
    ///
    /// Raising it stops the session at the next page boundary.
    #[must_use]
    pub fn abort_handle(&self) -> AbortFlag {
        self.abort.clone()
    }

    /// Subscribes to phase transitions.
    #[must_use]
    pub fn phase_watch(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    /// The report of the last finished session, for any terminal
    /// status. An aborted session reports the work done before the
    /// stop.
    #[must_use]
    pub fn result(&self) -> Option<&SyncReport> {
        self.report.as_ref()
    }

    /// The local store this engine drives.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one full session and returns its terminal status.
    pub async fn start(&mut self) -> SyncStatus {
        self.state = SessionState::default();
        self.report = None;

        let mode = match self.config.last_sync {
            None => SyncMode::Slow,
            Some(_) => SyncMode::Fast,
        };
        tracing::info!(target = %self.config.target, %mode, "starting sync session");

        let status = self.run(mode).await;

        let report = SyncReport {
            target: self.config.target.clone(),
            local: self.state.local_counts,
            remote: self.state.remote_counts,
            status,
            finished_at: Timestamp::now(),
        };
        tracing::info!(
            %status,
            local_added = report.local.added,
            local_modified = report.local.modified,
            local_deleted = report.local.deleted,
            remote_added = report.remote.added,
            remote_modified = report.remote.modified,
            remote_deleted = report.remote.deleted,
            "sync session finished"
        );
        self.report = Some(report);

        self.set_phase(match status {
            SyncStatus::Done => SyncPhase::Idle,
            SyncStatus::Aborted => SyncPhase::Aborted,
            _ => SyncPhase::Error,
        });
        status
    }

    async fn run(&mut self, mode: SyncMode) -> SyncStatus {
        self.set_phase(SyncPhase::Authenticating);
        let session = SourceSession {
            account: self.config.account.clone(),
            token: self.config.auth_token.clone(),
            target: self.config.target.clone(),
            abort: self.abort.clone(),
        };
        if let Err(status) = self.source.init(session) {
            tracing::warn!(%status, "remote source rejected the session");
            return status;
        }
        if self.abort.is_raised() {
            return SyncStatus::Aborted;
        }

        match mode {
            SyncMode::Slow => self.run_slow().await,
            SyncMode::Fast => self.run_fast().await,
        }
    }

    /// Full exchange: everything remote comes down, everything local
    /// goes up.
    async fn run_slow(&mut self) -> SyncStatus {
        // The snapshot is taken before any remote record lands locally;
        // it is the push set, so freshly stored records are not echoed
        // straight back.
        self.state.snapshot = match self.store.all_ids().await {
            Ok(ids) => ids,
            Err(e) => return db_failure(&e),
        };
        tracing::debug!(local = self.state.snapshot.len(), "local snapshot taken");

        self.set_phase(SyncPhase::FetchingRemote);
        let query = FetchQuery {
            updated_since: None,
            include_deleted: false,
        };
        let (tx, rx) = mpsc::channel(1);
        let (fetch_status, consumed) = tokio::join!(
            self.source.fetch_contacts(query, tx),
            consume_slow(&self.store, &mut self.state, rx)
        );
        if let Err(status) = consumed {
            return status;
        }
        if fetch_status != SyncStatus::Done {
            return fetch_status;
        }
        if self.abort.is_raised() {
            return SyncStatus::Aborted;
        }

        self.set_phase(SyncPhase::Reconciling);
        let mut push = Vec::with_capacity(self.state.snapshot.len());
        for id in &self.state.snapshot {
            match self.store.get(id).await {
                Ok(Some(record)) => push.push(record),
                Ok(None) => tracing::warn!(%id, "snapshot contact disappeared before push"),
                Err(e) => return db_failure(&e),
            }
        }
        if self.abort.is_raised() {
            return SyncStatus::Aborted;
        }

        self.set_phase(SyncPhase::PushingRemote);
        self.source.begin_transaction();
        self.source.save_contacts(push);
        let status = self.commit_and_record().await;
        if status != SyncStatus::Done {
            return status;
        }

        self.finalize().await
    }

    /// Delta exchange against the padded last-sync time.
    async fn run_fast(&mut self) -> SyncStatus {
        let Some(since) = self.config.since() else {
            // Unreachable through start(), which routes a missing
            // last-sync time to run_slow.
            return SyncStatus::Error;
        };

        // Local deltas first; they double as the conflict table.
        let added = match self.store.added_since(since).await {
            Ok(pairs) => pairs,
            Err(e) => return db_failure(&e),
        };
        let modified = match self.store.modified_since(since).await {
            Ok(pairs) => pairs,
            Err(e) => return db_failure(&e),
        };
        let deleted = match self.store.deleted_since(since).await {
            Ok(pairs) => pairs,
            Err(e) => return db_failure(&e),
        };
        tracing::debug!(
            added = added.len(),
            modified = modified.len(),
            deleted = deleted.len(),
            "local deltas loaded"
        );
        self.state.load_deltas(added, modified, deleted);

        self.set_phase(SyncPhase::FetchingRemote);
        let query = FetchQuery {
            updated_since: Some(since),
            include_deleted: true,
        };
        let policy = self.config.conflict_policy;
        let (tx, rx) = mpsc::channel(1);
        let (fetch_status, consumed) = tokio::join!(
            self.source.fetch_contacts(query, tx),
            consume_fast(&self.store, &mut self.state, policy, rx)
        );
        if let Err(status) = consumed {
            return status;
        }
        if fetch_status != SyncStatus::Done {
            return fetch_status;
        }
        if self.abort.is_raised() {
            return SyncStatus::Aborted;
        }

        self.set_phase(SyncPhase::Reconciling);
        let mut to_save = Vec::new();
        for pair in &self.state.local_added {
            if let Some(record) = match self.store.get(&pair.local_id).await {
                Ok(record) => record,
                Err(e) => return db_failure(&e),
            } {
                to_save.push(record);
            }
        }
        let modified_survivors: Vec<LocalId> = self
            .state
            .local_modified
            .values()
            .cloned()
            .chain(self.state.local_modified_unsynced.iter().cloned())
            .collect();
        for id in &modified_survivors {
            match self.store.get(id).await {
                Ok(Some(record)) => to_save.push(record),
                Ok(None) => tracing::warn!(%id, "modified contact disappeared before push"),
                Err(e) => return db_failure(&e),
            }
        }
        let to_remove: Vec<ContactRecord> = self
            .state
            .local_deleted
            .iter()
            .map(|(remote_id, local_id)| {
                let mut record = ContactRecord::new();
                record.local_id = Some(local_id.clone());
                record.remote_id = Some(remote_id.clone());
                record
            })
            .collect();
        if self.abort.is_raised() {
            return SyncStatus::Aborted;
        }

        self.set_phase(SyncPhase::PushingRemote);
        self.source.begin_transaction();
        self.source.save_contacts(to_save);
        self.source.remove_contacts(to_remove);
        let status = self.commit_and_record().await;
        if status != SyncStatus::Done {
            return status;
        }

        self.finalize().await
    }

    /// Drives the queued batch and records its outcome. Results from
    /// pages that committed before a failure or abort are written back
    /// too; without their minted ids the next session would push those
    /// contacts again.
    async fn commit_and_record(&mut self) -> SyncStatus {
        let outcome = self.source.commit().await;
        self.tally_remote(&outcome);
        if let Err(e) = self.write_back(&outcome).await {
            return db_failure(&e);
        }
        outcome.status
    }

    async fn finalize(&mut self) -> SyncStatus {
        self.set_phase(SyncPhase::Finalizing);
        if let Err(e) = self.store.purge_tombstones().await {
            return db_failure(&e);
        }
        SyncStatus::Done
    }

    fn tally_remote(&mut self, outcome: &CommitOutcome) {
        self.state.remote_counts.added += count(outcome.created.len());
        self.state.remote_counts.modified += count(outcome.updated.len());
        self.state.remote_counts.deleted += count(outcome.removed_ids.len());
    }

    /// Writes commit results back into the store: remote ids for
    /// created records, then the records themselves so fresh version
    /// tags and server-side normalizations stick.
    async fn write_back(&mut self, outcome: &CommitOutcome) -> Result<(), StoreError> {
        for record in &outcome.created {
            match (&record.local_id, &record.remote_id) {
                (Some(local), Some(remote)) => {
                    self.store.set_remote_id(local, remote).await?;
                }
                _ => tracing::warn!(
                    local_id = ?record.local_id,
                    "created record came back without a usable id pair"
                ),
            }
        }

        let changed: Vec<ContactRecord> = outcome
            .created
            .iter()
            .chain(&outcome.updated)
            .filter(|r| r.local_id.is_some())
            .cloned()
            .collect();
        if !changed.is_empty() {
            let statuses = self.store.batch_modify(changed).await?;
            let failed = statuses.iter().filter(|s| **s != ItemStatus::Ok).count();
            if failed > 0 {
                tracing::warn!(failed, "some commit results could not be written back");
            }
        }
        Ok(())
    }

    fn set_phase(&self, phase: SyncPhase) {
        tracing::debug!(%phase, "sync phase");
        self.phase.send_replace(phase);
    }
}

/// Applies slow-sync fetch pages: every remote record not already known
/// by remote id is stored locally.
async fn consume_slow<S: LocalStore>(
    store: &S,
    state: &mut SessionState,
    mut pages: mpsc::Receiver<FetchPage>,
) -> Result<(), SyncStatus> {
    while let Some(page) = pages.recv().await {
        match page.status {
            SyncStatus::InProgress | SyncStatus::Done => {}
            status => return Err(status),
        }

        let mut fresh = Vec::new();
        for record in page.records {
            if record.is_tombstone() {
                // Never requested during slow sync.
                tracing::warn!(
                    remote_id = ?record.remote_id,
                    "ignoring tombstone in a slow sync feed"
                );
                continue;
            }
            let Some(remote_id) = record.remote_id.clone() else {
                tracing::warn!("ignoring remote record without a remote id");
                continue;
            };
            match store.local_id_of(&remote_id).await {
                // Already known; the push pass updates it instead.
                Ok(Some(_)) => {}
                Ok(None) => fresh.push(record),
                Err(e) => return Err(db_failure(&e)),
            }
        }

        if !fresh.is_empty() {
            let statuses = store.batch_add(fresh).await.map_err(|e| db_failure(&e))?;
            state.local_counts.added += tally_ok(&statuses, "add");
        }
    }
    Ok(())
}

/// Applies fast-sync fetch pages: partition, resolve conflicts against
/// the local delta maps, store the survivors.
async fn consume_fast<S: LocalStore>(
    store: &S,
    state: &mut SessionState,
    policy: ConflictPolicy,
    mut pages: mpsc::Receiver<FetchPage>,
) -> Result<(), SyncStatus> {
    while let Some(page) = pages.recv().await {
        match page.status {
            SyncStatus::InProgress | SyncStatus::Done => {}
            status => return Err(status),
        }
        apply_remote_page(store, state, policy, page.records).await?;
    }
    Ok(())
}

async fn apply_remote_page<S: LocalStore>(
    store: &S,
    state: &mut SessionState,
    policy: ConflictPolicy,
    records: Vec<ContactRecord>,
) -> Result<(), SyncStatus> {
    // Partition on the tombstone flag first, then on whether the remote
    // id is already known locally.
    let mut added = Vec::new();
    let mut modified = Vec::new();
    let mut deleted = Vec::new();
    for record in records {
        let Some(remote_id) = record.remote_id.clone() else {
            tracing::warn!("ignoring remote record without a remote id");
            continue;
        };
        if record.is_tombstone() {
            deleted.push(remote_id);
        } else {
            match store.local_id_of(&remote_id).await.map_err(|e| db_failure(&e))? {
                Some(local_id) => modified.push((remote_id, local_id, record)),
                None => added.push(record),
            }
        }
    }
    tracing::debug!(
        added = added.len(),
        modified = modified.len(),
        deleted = deleted.len(),
        "remote page partitioned"
    );

    resolve_conflicts(state, policy, &mut added, &mut modified, &mut deleted);

    if !added.is_empty() {
        let statuses = store.batch_add(added).await.map_err(|e| db_failure(&e))?;
        state.local_counts.added += tally_ok(&statuses, "add");
    }

    if !modified.is_empty() {
        let records: Vec<ContactRecord> = modified
            .into_iter()
            .map(|(_, local_id, mut record)| {
                record.local_id = Some(local_id);
                record
            })
            .collect();
        let statuses = store
            .batch_modify(records)
            .await
            .map_err(|e| db_failure(&e))?;
        state.local_counts.modified += tally_ok(&statuses, "modify");
    }

    if !deleted.is_empty() {
        let mut ids = Vec::new();
        for remote_id in &deleted {
            match store.local_id_of(remote_id).await.map_err(|e| db_failure(&e))? {
                Some(local_id) => ids.push(local_id),
                None => tracing::debug!(
                    %remote_id,
                    "remote tombstone for a contact this store never had"
                ),
            }
        }
        if !ids.is_empty() {
            let statuses = store.batch_remove(ids).await.map_err(|e| db_failure(&e))?;
            state.local_counts.deleted += tally_ok(&statuses, "remove");
        }
    }
    Ok(())
}

/// Drops the losing side of every conflict.
///
/// Remote records drop out of `added`/`modified`/`deleted`; local
/// changes drop out of the session's delta maps (and with them, out of
/// the push set). A contact deleted on both sides leaves both lists
/// with no operation emitted anywhere.
///
/// A remote modification of a locally deleted contact usually shows up
/// in `added`: deleting the local copy dropped its id mapping, so the
/// remote id no longer resolves. The `added` pass catches that case.
fn resolve_conflicts(
    state: &mut SessionState,
    policy: ConflictPolicy,
    added: &mut Vec<ContactRecord>,
    modified: &mut Vec<(RemoteId, LocalId, ContactRecord)>,
    deleted: &mut Vec<RemoteId>,
) {
    added.retain(|record| {
        let Some(remote_id) = record.remote_id.as_ref() else {
            return true;
        };
        if !state.local_deleted.contains_key(remote_id) {
            return true;
        }
        match policy {
            ConflictPolicy::ServerWins => {
                tracing::debug!(%remote_id, "modified remotely, deleted locally, resurrecting");
                state.local_deleted.remove(remote_id);
                true
            }
            ConflictPolicy::ClientWins => false,
        }
    });

    modified.retain(|(remote_id, _, _)| {
        if state.local_modified.contains_key(remote_id) {
            match policy {
                ConflictPolicy::ServerWins => {
                    tracing::debug!(%remote_id, "both modified, remote copy wins");
                    state.local_modified.remove(remote_id);
                    true
                }
                ConflictPolicy::ClientWins => {
                    tracing::debug!(%remote_id, "both modified, local copy wins");
                    false
                }
            }
        } else if state.local_deleted.contains_key(remote_id) {
            match policy {
                ConflictPolicy::ServerWins => {
                    tracing::debug!(%remote_id, "modified remotely, deleted locally, resurrecting");
                    state.local_deleted.remove(remote_id);
                    true
                }
                ConflictPolicy::ClientWins => false,
            }
        } else {
            true
        }
    });

    deleted.retain(|remote_id| {
        if state.local_deleted.contains_key(remote_id) {
            // Deleted on both sides: drop both, nothing to do anywhere.
            state.local_deleted.remove(remote_id);
            false
        } else if state.local_modified.contains_key(remote_id) {
            match policy {
                ConflictPolicy::ServerWins => {
                    tracing::debug!(%remote_id, "deleted remotely, modified locally, deleting");
                    state.local_modified.remove(remote_id);
                    true
                }
                ConflictPolicy::ClientWins => false,
            }
        } else {
            true
        }
    });
}

fn db_failure(e: &StoreError) -> SyncStatus {
    tracing::error!(error = %e, "local store failure");
    SyncStatus::DatabaseFailure
}

fn tally_ok(statuses: &[ItemStatus], operation: &str) -> u32 {
    let ok = statuses
        .iter()
        .filter(|s| matches!(s, ItemStatus::Ok))
        .count();
    if ok < statuses.len() {
        tracing::warn!(
            failed = statuses.len() - ok,
            operation,
            "some local store operations failed"
        );
    }
    count(ok)
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
