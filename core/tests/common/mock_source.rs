// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! A scriptable remote source for engine tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use absync_core::{
    BatchOp, BatchQueue, CommitOutcome, ContactRecord, FetchPage, FetchQuery, RemoteId,
    RemoteSource, SourceSession, SyncStatus, VersionTag,
};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A [`RemoteSource`] that delivers scripted fetch pages and commits
/// against an in-memory service.
///
/// Clones share state: the test keeps one handle for scripting and
/// post-run inspection while the engine owns the other. Commits mint
/// remote ids of the form `mock-{local_id}` for creates and refresh the
/// version tag on every save, mimicking a service echo.
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    shared: Arc<Mutex<Shared>>,
}

#[derive(Debug)]
struct Shared {
    // Script.
    pages: Vec<FetchPage>,
    fetch_status: SyncStatus,
    commit_status: SyncStatus,
    commit_failure_after: Option<usize>,
    init_error: Option<SyncStatus>,
    page_size: usize,
    abort_after_first_page: bool,
    // Session.
    session: Option<SourceSession>,
    queue: BatchQueue,
    // Observations.
    queries: Vec<FetchQuery>,
    saved: Vec<ContactRecord>,
    removed: Vec<ContactRecord>,
    transactions: usize,
    commits: usize,
    commit_page_sizes: Vec<usize>,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            pages: Vec::new(),
            fetch_status: SyncStatus::Done,
            commit_status: SyncStatus::Done,
            commit_failure_after: None,
            init_error: None,
            page_size: 10,
            abort_after_first_page: false,
            session: None,
            queue: BatchQueue::new(),
            queries: Vec::new(),
            saved: Vec::new(),
            removed: Vec::new(),
            transactions: 0,
            commits: 0,
            commit_page_sizes: Vec::new(),
        }
    }
}

impl MockSource {
    /// Creates a source that fetches nothing and commits everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues one fetch page for delivery, in order.
    pub fn push_page(&self, page: FetchPage) {
        self.lock().pages.push(page);
    }

    /// Scripts the status `fetch_contacts` returns once its pages are
    /// out.
    pub fn finish_fetch_with(&self, status: SyncStatus) {
        self.lock().fetch_status = status;
    }

    /// Scripts `commit` to fail with the given status.
    pub fn fail_commit(&self, status: SyncStatus) {
        self.lock().commit_status = status;
    }

    /// Scripts `commit` to stop with the given status after that many
    /// wire pages, keeping the committed pages' results in the outcome.
    pub fn fail_commit_after_pages(&self, pages: usize, status: SyncStatus) {
        let mut shared = self.lock();
        shared.commit_status = status;
        shared.commit_failure_after = Some(pages);
    }

    /// Scripts `init` to reject the session.
    pub fn fail_init(&self, status: SyncStatus) {
        self.lock().init_error = Some(status);
    }

    /// Sets the commit page bound.
    pub fn set_page_size(&self, size: usize) {
        self.lock().page_size = size;
    }

    /// Raises the session abort flag once the first page is out.
    pub fn abort_after_first_page(&self) {
        self.lock().abort_after_first_page = true;
    }

    /// The account the engine bound the session to.
    #[must_use]
    pub fn account(&self) -> Option<String> {
        self.lock().session.as_ref().map(|s| s.account.clone())
    }

    /// Every fetch query seen, in order.
    #[must_use]
    pub fn queries(&self) -> Vec<FetchQuery> {
        self.lock().queries.clone()
    }

    /// Every record handed to `save_contacts`, in order.
    #[must_use]
    pub fn saved(&self) -> Vec<ContactRecord> {
        self.lock().saved.clone()
    }

    /// Saved records that carried no remote id (pushed as creates).
    #[must_use]
    pub fn saved_creates(&self) -> Vec<ContactRecord> {
        self.lock()
            .saved
            .iter()
            .filter(|r| r.remote_id.is_none())
            .cloned()
            .collect()
    }

    /// Saved records that carried a remote id (pushed as updates).
    #[must_use]
    pub fn saved_updates(&self) -> Vec<ContactRecord> {
        self.lock()
            .saved
            .iter()
            .filter(|r| r.remote_id.is_some())
            .cloned()
            .collect()
    }

    /// Every record handed to `remove_contacts`, in order.
    #[must_use]
    pub fn removed(&self) -> Vec<ContactRecord> {
        self.lock().removed.clone()
    }

    /// Number of transactions begun.
    #[must_use]
    pub fn transactions(&self) -> usize {
        self.lock().transactions
    }

    /// Number of commits driven.
    #[must_use]
    pub fn commits(&self) -> usize {
        self.lock().commits
    }

    /// Operation count of every committed wire page, in order.
    #[must_use]
    pub fn commit_page_sizes(&self) -> Vec<usize> {
        self.lock().commit_page_sizes.clone()
    }
}

#[async_trait]
impl RemoteSource for MockSource {
    fn init(&mut self, session: SourceSession) -> Result<(), SyncStatus> {
        let mut shared = self.lock();
        if let Some(status) = shared.init_error {
            return Err(status);
        }
        if session.token.is_empty() {
            return Err(SyncStatus::AuthFailure);
        }
        shared.session = Some(session);
        Ok(())
    }

    async fn fetch_contacts(
        &mut self,
        query: FetchQuery,
        pages: mpsc::Sender<FetchPage>,
    ) -> SyncStatus {
        // Take the script out so the lock is not held across sends.
        let (scripted, final_status, abort_after_first, abort) = {
            let mut shared = self.lock();
            shared.queries.push(query);
            (
                std::mem::take(&mut shared.pages),
                shared.fetch_status,
                shared.abort_after_first_page,
                shared.session.as_ref().map(|s| s.abort.clone()),
            )
        };

        for (index, page) in scripted.into_iter().enumerate() {
            if let Some(abort) = &abort {
                if abort.is_raised() {
                    return SyncStatus::Aborted;
                }
            }
            if pages.send(page).await.is_err() {
                return SyncStatus::Error;
            }
            if index == 0 && abort_after_first {
                if let Some(abort) = &abort {
                    abort.raise();
                }
            }
        }
        final_status
    }

    fn begin_transaction(&mut self) {
        let mut shared = self.lock();
        shared.transactions += 1;
        shared.queue.clear();
    }

    fn save_contacts(&mut self, records: Vec<ContactRecord>) {
        let mut shared = self.lock();
        shared.saved.extend(records.iter().cloned());
        shared.queue.save(records);
    }

    fn remove_contacts(&mut self, records: Vec<ContactRecord>) {
        let mut shared = self.lock();
        shared.removed.extend(records.iter().cloned());
        shared.queue.remove(records);
    }

    async fn commit(&mut self) -> CommitOutcome {
        let mut shared = self.lock();
        shared.commits += 1;
        let failure = (shared.commit_status != SyncStatus::Done).then_some(shared.commit_status);
        if failure.is_some() && shared.commit_failure_after.is_none() {
            shared.queue.clear();
            return CommitOutcome::empty(shared.commit_status);
        }

        let page_size = shared.page_size;
        let fail_after = shared.commit_failure_after;
        let mut outcome = CommitOutcome::default();
        let mut pages_done = 0usize;
        loop {
            if let (Some(status), Some(limit)) = (failure, fail_after) {
                if pages_done == limit {
                    shared.queue.clear();
                    outcome.status = status;
                    return outcome;
                }
            }
            let ops = shared.queue.drain_page(page_size);
            if ops.is_empty() {
                break;
            }
            pages_done += 1;
            shared.commit_page_sizes.push(ops.len());
            for op in ops {
                match op {
                    BatchOp::Create(mut record) => {
                        let minted = record
                            .local_id
                            .as_ref()
                            .map_or_else(|| "mock-unknown".to_string(), |l| format!("mock-{l}"));
                        record.remote_id = Some(RemoteId::from(minted));
                        record.etag = Some(VersionTag::from("\"fresh-1\""));
                        outcome.created.push(record);
                    }
                    BatchOp::Update(mut record) => {
                        record.etag = Some(VersionTag::from("\"fresh-2\""));
                        outcome.updated.push(record);
                    }
                    BatchOp::Delete(record) => {
                        if let Some(local) = record.local_id {
                            outcome.removed_ids.push(local);
                        }
                    }
                }
            }
        }
        outcome
    }
}
