// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The GData remote source.

use std::collections::HashMap;
use std::path::PathBuf;

use absync_atom::{
    Avatar, BatchEntry, BatchKind, ContactFeed, ContactRecord, FeedWriter, LocalId, VersionTag,
    parse_feed,
};
use absync_core::{
    BatchOp, BatchQueue, CommitOutcome, FetchPage, FetchQuery, RemoteSource, SourceSession,
    SyncStatus,
};
use async_trait::async_trait;
use reqwest::Method;
use tokio::sync::mpsc;

use crate::avatar::{AvatarDownloader, AvatarUploader};
use crate::config::{AuthMethod, GDataConfig};
use crate::error::GDataError;
use crate::http::{BATCH_CONTENT_TYPE, HttpClient};
use crate::request::FetchRequest;

/// Protocol phase of the source.
///
/// Fetch and commit both claim the source exclusively; a second call
/// while one is running is rejected without touching the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceState {
    Idle,
    FetchingContacts,
    BatchRunning,
}

/// A local photo file waiting for its contact's commit.
#[derive(Debug, Clone)]
struct PendingAvatar {
    path: PathBuf,
    etag: Option<VersionTag>,
}

/// A drained operation, kept around until its response arrives.
#[derive(Debug)]
struct QueuedOp {
    kind: BatchKind,
    record: ContactRecord,
}

/// Per-item results of one committed wire page.
#[derive(Debug, Default)]
struct PageResult {
    created: Vec<ContactRecord>,
    updated: Vec<ContactRecord>,
    removed_ids: Vec<LocalId>,
}

/// GData contacts source.
///
/// Implements [`RemoteSource`] against a GData-style contacts service:
/// paged feed fetches, batched uploads with per-item result
/// demultiplexing, and the photo side channel.
///
/// # Example
///
/// ```ignore
/// use absync_core::{AbortFlag, RemoteSource, SourceSession};
/// use absync_gdata::{GDataClient, GDataConfig};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut source = GDataClient::new(GDataConfig::default());
/// source.init(SourceSession {
///     account: "user@example.com".to_string(),
///     token: std::env::var("ABSYNC_TOKEN")?,
///     target: "google".to_string(),
///     abort: AbortFlag::new(),
/// })?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct GDataClient {
    config: GDataConfig,
    http: Option<HttpClient>,
    session: Option<SourceSession>,
    state: SourceState,
    queue: BatchQueue,
    avatars: HashMap<LocalId, PendingAvatar>,
}

impl GDataClient {
    /// Creates an uninitialized source.
    ///
    /// The source is not usable until [`RemoteSource::init`] binds it
    /// to a session.
    #[must_use]
    pub fn new(config: GDataConfig) -> Self {
        Self {
            config,
            http: None,
            session: None,
            state: SourceState::Idle,
            queue: BatchQueue::new(),
            avatars: HashMap::new(),
        }
    }

    /// Delivers the terminal error page and echoes the status.
    async fn fail_fetch(pages: &mpsc::Sender<FetchPage>, status: SyncStatus) -> SyncStatus {
        if pages.send(FetchPage::status_only(status)).await.is_err() {
            tracing::debug!("page receiver dropped before the error page");
        }
        status
    }

    async fn fetch_pages(&self, query: FetchQuery, pages: &mpsc::Sender<FetchPage>) -> SyncStatus {
        let (Some(http), Some(session)) = (&self.http, &self.session) else {
            tracing::warn!("fetch requested on an uninitialized source");
            return Self::fail_fetch(pages, SyncStatus::Error).await;
        };

        let feed_url = self.config.feed_url(&session.account);
        let mut start_index = 1;

        loop {
            let mut request = FetchRequest::new(&feed_url)
                .max_results(self.config.page_size)
                .show_deleted(query.include_deleted);
            if let Some(since) = query.updated_since {
                request = request.updated_min(since);
            }
            if start_index > 1 {
                request = request.start_index(start_index);
            }

            let feed = match Self::fetch_feed(http, &request.build_url()).await {
                Ok(feed) => feed,
                Err(e) => {
                    let status = e.sync_status();
                    tracing::warn!(error = %e, ?status, "feed page fetch failed");
                    return Self::fail_fetch(pages, status).await;
                }
            };
            tracing::debug!(
                contacts = feed.contacts.len(),
                deleted = feed.deleted.len(),
                start_index,
                "feed page fetched"
            );

            let mut records = feed.contacts;
            if self.config.fetch_avatars {
                Self::download_avatars(http, &mut records).await;
            }
            records.extend(feed.deleted);

            let has_more = feed.next_url.is_some();
            let status = if has_more {
                SyncStatus::InProgress
            } else {
                SyncStatus::Done
            };
            if pages.send(FetchPage { records, status }).await.is_err() {
                tracing::debug!("page receiver dropped, fetch abandoned");
                return SyncStatus::Aborted;
            }

            if !has_more {
                return SyncStatus::Done;
            }
            if session.abort.is_raised() {
                tracing::info!("abort raised between feed pages");
                return Self::fail_fetch(pages, SyncStatus::Aborted).await;
            }
            start_index += self.config.page_size;
        }
    }

    async fn fetch_feed(http: &HttpClient, url: &str) -> Result<ContactFeed, GDataError> {
        let req = http.build_request(Method::GET, url);
        let resp = http.execute(req).await?;
        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Err(GDataError::EmptyBody);
        }
        Ok(parse_feed(&body)?)
    }

    /// Replaces remote avatar URLs with downloaded cache files.
    ///
    /// Records whose download failed keep the remote URL.
    async fn download_avatars(http: &HttpClient, records: &mut [ContactRecord]) {
        let mut downloader = AvatarDownloader::new(http);
        for record in records.iter() {
            if let Some(avatar) = &record.avatar {
                if avatar.url.starts_with("http") {
                    downloader.push(avatar.url.clone());
                }
            }
        }
        if downloader.is_empty() {
            return;
        }

        let files = downloader.run().await;
        for record in records.iter_mut() {
            if let Some(avatar) = &mut record.avatar {
                if let Some(path) = files.get(&avatar.url) {
                    avatar.url = path.display().to_string();
                }
            }
        }
    }

    async fn push_pages(&mut self) -> CommitOutcome {
        let (Some(http), Some(session)) = (&self.http, &self.session) else {
            tracing::warn!("commit requested on an uninitialized source");
            self.queue.clear();
            return CommitOutcome::empty(SyncStatus::Error);
        };

        let batch_url = self.config.batch_url(&session.account);
        let writer = FeedWriter::new(Some(session.account.clone()));
        let mut outcome = CommitOutcome::default();

        loop {
            let ops = self.queue.drain_page(self.config.page_size);
            if ops.is_empty() {
                break;
            }

            let (entries, queued) = Self::assemble_page(ops);
            let body = match writer.encode_batch(&entries) {
                Ok(body) => body,
                Err(e) => {
                    tracing::error!(error = %e, "batch feed encoding failed");
                    self.queue.clear();
                    outcome.status = SyncStatus::Error;
                    return outcome;
                }
            };

            let feed = match Self::post_batch(http, &batch_url, body).await {
                Ok(feed) => feed,
                Err(e) => {
                    let status = e.sync_status();
                    tracing::warn!(error = %e, ?status, "batch page POST failed");
                    self.queue.clear();
                    outcome.status = status;
                    return outcome;
                }
            };

            let mut page = match Self::demux_page(&queued, &feed) {
                Ok(page) => page,
                Err(status) => {
                    self.queue.clear();
                    outcome.status = status;
                    return outcome;
                }
            };

            Self::push_avatars(&mut self.avatars, http, &session.account, &mut page).await;

            outcome.created.append(&mut page.created);
            outcome.updated.append(&mut page.updated);
            outcome.removed_ids.append(&mut page.removed_ids);

            if session.abort.is_raised() && !self.queue.is_empty() {
                tracing::info!(pending = self.queue.len(), "abort raised between batch pages");
                self.queue.clear();
                outcome.status = SyncStatus::Aborted;
                return outcome;
            }
        }

        tracing::info!(
            created = outcome.created.len(),
            updated = outcome.updated.len(),
            removed = outcome.removed_ids.len(),
            "batch transaction committed"
        );
        outcome
    }

    /// Splits a drained page into wire entries and the correlation map
    /// the response is demultiplexed against.
    fn assemble_page(ops: Vec<BatchOp>) -> (Vec<BatchEntry>, HashMap<LocalId, QueuedOp>) {
        let mut entries = Vec::with_capacity(ops.len());
        let mut queued = HashMap::with_capacity(ops.len());

        for op in ops {
            let kind = match &op {
                BatchOp::Create(_) => BatchKind::Create,
                BatchOp::Update(_) => BatchKind::Update,
                BatchOp::Delete(_) => BatchKind::Delete,
            };
            let record = op.into_record();
            if let Some(local_id) = record.local_id.clone() {
                queued.insert(
                    local_id,
                    QueuedOp {
                        kind,
                        record: record.clone(),
                    },
                );
            }
            entries.push(BatchEntry::new(kind, record));
        }
        (entries, queued)
    }

    async fn post_batch(
        http: &HttpClient,
        url: &str,
        body: String,
    ) -> Result<ContactFeed, GDataError> {
        let req = http
            .build_request(Method::POST, url)
            .header("Content-Type", BATCH_CONTENT_TYPE)
            .body(body);
        let resp = http.execute(HttpClient::if_match_any(req)).await?;
        let text = resp.text().await?;
        if text.trim().is_empty() {
            return Err(GDataError::EmptyBody);
        }
        Ok(parse_feed(&text)?)
    }

    /// Sorts one page of batch responses into created, updated and
    /// removed records.
    ///
    /// A `404` answering an update means the record is gone server-side;
    /// it converges as a completed delete. Any other per-item failure
    /// fails the whole commit, nothing of the page is kept.
    fn demux_page(
        queued: &HashMap<LocalId, QueuedOp>,
        feed: &ContactFeed,
    ) -> Result<PageResult, SyncStatus> {
        let mut page = PageResult::default();

        for response in &feed.batch_responses {
            let Some(local_id) = response.local_id.clone() else {
                tracing::warn!(code = %response.code, "batch response without a correlation id");
                return Err(SyncStatus::Error);
            };
            let queued_op = queued.get(&local_id);
            let kind = response.kind.or(queued_op.map(|op| op.kind));

            if !response.is_success() {
                if response.code == "404" && kind == Some(BatchKind::Update) {
                    tracing::debug!(%local_id, "update hit a deleted contact, treating as removed");
                    page.removed_ids.push(local_id);
                    continue;
                }
                tracing::error!(
                    %local_id,
                    ?kind,
                    code = %response.code,
                    reason = %response.reason,
                    description = %response.description,
                    "batch operation failed"
                );
                return Err(SyncStatus::Error);
            }

            match kind {
                Some(BatchKind::Create | BatchKind::Update) => {
                    let mut record = if response.contact.remote_id.is_some() {
                        response.contact.clone()
                    } else if let Some(op) = queued_op {
                        // A 304 echoes no payload; keep what was sent.
                        op.record.clone()
                    } else {
                        tracing::warn!(%local_id, "batch response for an unknown operation");
                        return Err(SyncStatus::Error);
                    };
                    record.local_id = Some(local_id);
                    if kind == Some(BatchKind::Create) {
                        page.created.push(record);
                    } else {
                        page.updated.push(record);
                    }
                }
                Some(BatchKind::Delete) => page.removed_ids.push(local_id),
                None => {
                    tracing::warn!(%local_id, "batch response with no operation kind");
                    return Err(SyncStatus::Error);
                }
            }
        }

        Ok(page)
    }

    /// Uploads pending local photos for the page's surviving records
    /// and merges the fresh version tags back in.
    ///
    /// An upload is skipped when the stored photo tag still matches the
    /// one the server just echoed.
    async fn push_avatars(
        pending: &mut HashMap<LocalId, PendingAvatar>,
        http: &HttpClient,
        account: &str,
        page: &mut PageResult,
    ) {
        if pending.is_empty() {
            return;
        }

        let mut uploader = AvatarUploader::new(http, account);
        for record in page.created.iter().chain(page.updated.iter()) {
            let Some(local_id) = record.local_id.clone() else {
                continue;
            };
            let Some(queued) = pending.get(&local_id) else {
                continue;
            };
            let Some(remote_id) = record.remote_id.clone() else {
                tracing::warn!(%local_id, "no remote id after commit, photo not uploaded");
                continue;
            };

            let server_etag = record.avatar.as_ref().and_then(|a| a.etag.as_ref());
            if queued.etag.is_some() && queued.etag.as_ref() == server_etag {
                tracing::debug!(%local_id, "photo unchanged, skipping upload");
                pending.remove(&local_id);
                continue;
            }
            uploader.push(remote_id, queued.path.clone());
        }
        if uploader.is_empty() {
            return;
        }

        let replies = uploader.run().await;
        for record in page.created.iter_mut().chain(page.updated.iter_mut()) {
            let Some(local_id) = record.local_id.clone() else {
                continue;
            };
            let Some(queued) = pending.get(&local_id) else {
                continue;
            };
            let Some(reply) = record.remote_id.as_ref().and_then(|id| replies.get(id)) else {
                continue;
            };

            if let Some(etag) = &reply.etag {
                record.etag = Some(etag.clone());
            }
            record.avatar = Some(Avatar {
                url: queued.path.display().to_string(),
                etag: reply.avatar_etag.clone(),
            });
            pending.remove(&local_id);
        }
    }
}

#[async_trait]
impl RemoteSource for GDataClient {
    fn init(&mut self, session: SourceSession) -> Result<(), SyncStatus> {
        if self.state != SourceState::Idle {
            tracing::warn!(state = ?self.state, "init requested while busy");
            return Err(SyncStatus::Error);
        }
        if session.token.is_empty() {
            tracing::warn!(account = %session.account, "session carries no token");
            return Err(SyncStatus::AuthFailure);
        }

        let auth = AuthMethod::Bearer {
            token: session.token.clone(),
        };
        let http = HttpClient::new(self.config.clone(), auth).map_err(|e| {
            tracing::error!(error = %e, "HTTP client construction failed");
            SyncStatus::Error
        })?;

        tracing::debug!(account = %session.account, target = %session.target, "source bound");
        self.http = Some(http);
        self.session = Some(session);
        self.queue.clear();
        self.avatars.clear();
        Ok(())
    }

    async fn fetch_contacts(
        &mut self,
        query: FetchQuery,
        pages: mpsc::Sender<FetchPage>,
    ) -> SyncStatus {
        if self.state != SourceState::Idle {
            tracing::warn!(state = ?self.state, "fetch requested while busy");
            return Self::fail_fetch(&pages, SyncStatus::Error).await;
        }

        self.state = SourceState::FetchingContacts;
        let status = self.fetch_pages(query, &pages).await;
        self.state = SourceState::Idle;
        status
    }

    fn begin_transaction(&mut self) {
        self.queue.clear();
        self.avatars.clear();
    }

    fn save_contacts(&mut self, records: Vec<ContactRecord>) {
        for record in &records {
            let (Some(local_id), Some(avatar)) = (&record.local_id, &record.avatar) else {
                continue;
            };
            // Only local files are uploadable; remote URLs are already
            // the server's own.
            if avatar.url.is_empty() || avatar.url.starts_with("http") {
                continue;
            }
            self.avatars.insert(
                local_id.clone(),
                PendingAvatar {
                    path: PathBuf::from(&avatar.url),
                    etag: avatar.etag.clone(),
                },
            );
        }
        self.queue.save(records);
    }

    fn remove_contacts(&mut self, records: Vec<ContactRecord>) {
        self.queue.remove(records);
    }

    async fn commit(&mut self) -> CommitOutcome {
        if self.state != SourceState::Idle {
            tracing::warn!(state = ?self.state, "commit requested while busy");
            return CommitOutcome::empty(SyncStatus::Error);
        }
        if self.queue.is_empty() {
            tracing::debug!("commit with an empty queue");
            return CommitOutcome::empty(SyncStatus::Done);
        }

        self.state = SourceState::BatchRunning;
        let outcome = self.push_pages().await;
        self.state = SourceState::Idle;
        outcome
    }
}
