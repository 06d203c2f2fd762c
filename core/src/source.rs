// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The remote service seam.

use std::collections::VecDeque;

use absync_atom::{ContactRecord, LocalId};
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::abort::AbortFlag;
use crate::status::SyncStatus;

/// Everything a source needs to talk to the service for one session.
#[derive(Debug, Clone)]
pub struct SourceSession {
    /// Account name (the feed owner, typically an email address).
    pub account: String,
    /// Bearer token for the service. Acquiring it is the host's job.
    pub token: String,
    /// Name of the sync target, used for logging and the report.
    pub target: String,
    /// Cancellation flag shared with the engine.
    pub abort: AbortFlag,
}

/// What to fetch from the remote side.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchQuery {
    /// Only records updated strictly after this instant. `None` fetches
    /// everything (slow sync).
    pub updated_since: Option<jiff::Timestamp>,
    /// Whether to ask the service for deletion tombstones too.
    pub include_deleted: bool,
}

/// One page of fetched records.
///
/// Pages arrive in feed order. `status` is [`SyncStatus::InProgress`]
/// while more pages follow and [`SyncStatus::Done`] on the final page;
/// on failure the source delivers one last page with no records and the
/// classified error status.
#[derive(Debug, Clone)]
pub struct FetchPage {
    /// Records of this page, live entries first, tombstones after.
    pub records: Vec<ContactRecord>,
    /// Page status.
    pub status: SyncStatus,
}

impl FetchPage {
    /// A record-free page carrying only a status.
    #[must_use]
    pub const fn status_only(status: SyncStatus) -> Self {
        Self {
            records: Vec::new(),
            status,
        }
    }
}

/// Combined result of one commit, covering every wire page it took.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    /// Records created remotely, with their new remote ids and version
    /// tags merged in.
    pub created: Vec<ContactRecord>,
    /// Records updated remotely, with fresh version tags merged in.
    pub updated: Vec<ContactRecord>,
    /// Local ids of records removed remotely.
    pub removed_ids: Vec<LocalId>,
    /// Final status. `Done` only when every page committed.
    pub status: SyncStatus,
}

impl CommitOutcome {
    /// An empty outcome with the given status.
    #[must_use]
    pub const fn empty(status: SyncStatus) -> Self {
        Self {
            created: Vec::new(),
            updated: Vec::new(),
            removed_ids: Vec::new(),
            status,
        }
    }
}

impl Default for CommitOutcome {
    fn default() -> Self {
        Self::empty(SyncStatus::Done)
    }
}

/// One pending remote mutation.
#[derive(Debug, Clone)]
pub enum BatchOp {
    /// Create a record that does not exist remotely.
    Create(ContactRecord),
    /// Update an existing remote record.
    Update(ContactRecord),
    /// Delete an existing remote record.
    Delete(ContactRecord),
}

impl BatchOp {
    /// The record this operation carries.
    #[must_use]
    pub const fn record(&self) -> &ContactRecord {
        match self {
            Self::Create(r) | Self::Update(r) | Self::Delete(r) => r,
        }
    }

    /// Unwraps the record.
    #[must_use]
    pub fn into_record(self) -> ContactRecord {
        match self {
            Self::Create(r) | Self::Update(r) | Self::Delete(r) => r,
        }
    }
}

/// Pending operations of one remote transaction.
///
/// Operations queue FIFO within their kind. [`drain_page`] assembles
/// deterministic wire pages: creates first, then updates, then deletes,
/// up to the page bound.
///
/// [`drain_page`]: BatchQueue::drain_page
#[derive(Debug, Default)]
pub struct BatchQueue {
    creates: VecDeque<ContactRecord>,
    updates: VecDeque<ContactRecord>,
    deletes: VecDeque<ContactRecord>,
}

impl BatchQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one operation.
    pub fn push(&mut self, op: BatchOp) {
        match op {
            BatchOp::Create(r) => self.creates.push_back(r),
            BatchOp::Update(r) => self.updates.push_back(r),
            BatchOp::Delete(r) => self.deletes.push_back(r),
        }
    }

    /// Queues records to save, classifying each as a create or an
    /// update by remote-id presence.
    pub fn save(&mut self, records: Vec<ContactRecord>) {
        for record in records {
            if record.remote_id.is_some() {
                self.updates.push_back(record);
            } else {
                self.creates.push_back(record);
            }
        }
    }

    /// Queues records to delete remotely.
    pub fn remove(&mut self, records: Vec<ContactRecord>) {
        for record in records {
            if record.remote_id.is_none() {
                tracing::warn!(
                    local_id = ?record.local_id,
                    "dropping remote delete for a contact that was never created remotely"
                );
                continue;
            }
            self.deletes.push_back(record);
        }
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    /// Number of pending operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.creates.len() + self.updates.len() + self.deletes.len()
    }

    /// Takes up to `max` operations off the queue, creates first, then
    /// updates, then deletes, each FIFO.
    pub fn drain_page(&mut self, max: usize) -> Vec<BatchOp> {
        let mut page = Vec::with_capacity(max.min(self.len()));
        while page.len() < max {
            if let Some(r) = self.creates.pop_front() {
                page.push(BatchOp::Create(r));
            } else if let Some(r) = self.updates.pop_front() {
                page.push(BatchOp::Update(r));
            } else if let Some(r) = self.deletes.pop_front() {
                page.push(BatchOp::Delete(r));
            } else {
                break;
            }
        }
        page
    }

    /// Drops everything pending.
    pub fn clear(&mut self) {
        self.creates.clear();
        self.updates.clear();
        self.deletes.clear();
    }
}

/// A remote contacts service.
///
/// One source serves one session at a time: a fetch or a commit that
/// arrives while another is running is rejected outright (an error page
/// on the fetch path, an error outcome on the commit path).
///
/// The transaction methods ([`begin_transaction`], [`save_contacts`],
/// [`remove_contacts`]) only queue work; [`commit`] drives the wire
/// protocol and returns one combined outcome for the whole transaction.
///
/// [`begin_transaction`]: RemoteSource::begin_transaction
/// [`save_contacts`]: RemoteSource::save_contacts
/// [`remove_contacts`]: RemoteSource::remove_contacts
/// [`commit`]: RemoteSource::commit
#[async_trait]
pub trait RemoteSource: Send {
    /// Binds the source to a session.
    ///
    /// # Errors
    ///
    /// Returns the status the session should terminate with, notably
    /// [`SyncStatus::AuthFailure`] when the session carries no usable
    /// token.
    fn init(&mut self, session: SourceSession) -> Result<(), SyncStatus>;

    /// Streams matching remote records into `pages`, one [`FetchPage`]
    /// per wire page, and returns the final page's status.
    async fn fetch_contacts(
        &mut self,
        query: FetchQuery,
        pages: mpsc::Sender<FetchPage>,
    ) -> SyncStatus;

    /// Opens a transaction, dropping whatever a previous one left
    /// queued.
    fn begin_transaction(&mut self);

    /// Queues records to create or update, classified by remote-id
    /// presence.
    fn save_contacts(&mut self, records: Vec<ContactRecord>);

    /// Queues records to delete.
    fn remove_contacts(&mut self, records: Vec<ContactRecord>);

    /// Pushes every queued operation and returns the combined outcome.
    /// An empty queue commits immediately with [`SyncStatus::Done`].
    async fn commit(&mut self) -> CommitOutcome;
}
