// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Contact photo side channel.
//!
//! Photos live outside the contacts feed: uploads are sequential PUTs
//! against the photo media endpoint, downloads are plain GETs into a
//! local cache directory. Uploading bumps both the contact and the
//! photo version tags server-side, so after a round of uploads the
//! fresh tags are read back with a fields-projection query.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use absync_atom::{RemoteId, VersionTag, schema, xml};
use jiff::Timestamp;
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::GDataError;
use crate::http::HttpClient;
use crate::request::format_timestamp;

/// Version tags a finished upload round reports for one contact.
///
/// Both fields stay `None` when the upload failed or the refresh query
/// did not mention the contact.
#[derive(Debug, Clone, Default)]
pub(crate) struct UploadReply {
    /// Fresh contact version tag.
    pub etag: Option<VersionTag>,
    /// Fresh photo version tag.
    pub avatar_etag: Option<VersionTag>,
}

/// Uploads queued local photo files, one contact at a time.
#[derive(Debug)]
pub(crate) struct AvatarUploader<'a> {
    http: &'a HttpClient,
    account: &'a str,
    queue: Vec<(RemoteId, PathBuf)>,
}

impl<'a> AvatarUploader<'a> {
    pub fn new(http: &'a HttpClient, account: &'a str) -> Self {
        Self {
            http,
            account,
            queue: Vec::new(),
        }
    }

    pub fn push(&mut self, remote_id: RemoteId, path: PathBuf) {
        self.queue.push((remote_id, path));
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Runs all queued uploads, then refreshes the version tags.
    ///
    /// Every attempted contact gets a reply entry, failed uploads
    /// included; upload and refresh failures are logged, never fatal.
    pub async fn run(self) -> HashMap<RemoteId, UploadReply> {
        let started_at = Timestamp::now();
        let mut replies = HashMap::new();

        for (remote_id, path) in &self.queue {
            replies.insert(remote_id.clone(), UploadReply::default());
            if let Err(e) = self.upload(remote_id, path).await {
                tracing::warn!(%remote_id, error = %e, "avatar upload failed");
            }
        }

        if let Err(e) = self.refresh_tags(started_at, &mut replies).await {
            tracing::warn!(error = %e, "avatar tag refresh failed");
        }
        replies
    }

    async fn upload(&self, remote_id: &RemoteId, path: &Path) -> Result<(), GDataError> {
        let bytes = tokio::fs::read(path).await?;
        let url = self.http.config().photo_media_url(self.account, remote_id);
        let req = self
            .http
            .build_request(reqwest::Method::PUT, &url)
            .header("Content-Type", "image/*")
            .body(bytes);
        self.http.execute(HttpClient::if_match_any(req)).await?;
        tracing::debug!(%remote_id, "avatar uploaded");
        Ok(())
    }

    /// Queries the fresh contact and photo tags for everything updated
    /// since the uploads started and merges them into the replies.
    async fn refresh_tags(
        &self,
        since: Timestamp,
        replies: &mut HashMap<RemoteId, UploadReply>,
    ) -> Result<(), GDataError> {
        if replies.is_empty() {
            return Ok(());
        }

        let url = format!(
            "{}?updated-min={}&fields=entry(@gd:etag,id,link(@rel,@gd:etag))",
            self.http.config().feed_url(self.account),
            format_timestamp(since),
        );
        let req = self.http.build_request(reqwest::Method::GET, &url);
        let resp = self.http.execute(req).await?;
        let body = resp.text().await?;

        for entry in parse_tag_entries(&body)? {
            let Some(reply) = entry.remote_id.and_then(|id| replies.get_mut(&id)) else {
                continue;
            };
            reply.etag = entry.etag;
            reply.avatar_etag = entry.avatar_etag;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct TagEntry {
    remote_id: Option<RemoteId>,
    etag: Option<VersionTag>,
    avatar_etag: Option<VersionTag>,
}

/// Parses the fields-projection feed the tag refresh query returns.
///
/// The projected entries carry only the `gd:etag` attribute, the entry
/// id and the photo link, so the full contact reader does not apply.
fn parse_tag_entries(body: &str) -> Result<Vec<TagEntry>, GDataError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = true;

    let mut entries = Vec::new();
    let mut current: Option<TagEntry> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.name().as_ref() {
                b"entry" | b"atom:entry" => {
                    current = Some(TagEntry {
                        etag: xml::attr(e, "gd:etag")?.map(VersionTag::new),
                        ..TagEntry::default()
                    });
                }
                b"id" | b"atom:id" if current.is_some() => {
                    let id = xml::read_text(&mut reader, e.name().as_ref())?;
                    if let Some(entry) = current.as_mut() {
                        entry.remote_id = id
                            .rsplit('/')
                            .next()
                            .filter(|s| !s.is_empty())
                            .map(RemoteId::from);
                    }
                }
                b"link" | b"atom:link" => {
                    read_photo_link(e, current.as_mut())?;
                    xml::skip_element(&mut reader, e.name().as_ref())?;
                }
                _ => {}
            },
            Event::Empty(ref e) if matches!(e.name().as_ref(), b"link" | b"atom:link") => {
                read_photo_link(e, current.as_mut())?;
            }
            Event::End(ref e) if matches!(e.name().as_ref(), b"entry" | b"atom:entry") => {
                entries.extend(current.take());
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}

fn read_photo_link(
    e: &quick_xml::events::BytesStart<'_>,
    current: Option<&mut TagEntry>,
) -> Result<(), GDataError> {
    let Some(entry) = current else {
        return Ok(());
    };
    if xml::attr(e, "rel")?.as_deref() == Some(schema::PHOTO_REL) {
        entry.avatar_etag = xml::attr(e, "gd:etag")?.map(VersionTag::new);
    }
    Ok(())
}

/// Downloads queued remote photo URLs into the cache directory.
#[derive(Debug)]
pub(crate) struct AvatarDownloader<'a> {
    http: &'a HttpClient,
    queue: Vec<String>,
}

impl<'a> AvatarDownloader<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self {
            http,
            queue: Vec::new(),
        }
    }

    pub fn push(&mut self, url: String) {
        self.queue.push(url);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Downloads every queued URL, returning the local file per URL.
    ///
    /// Failed downloads are logged and skipped; the record then keeps
    /// its remote URL.
    pub async fn run(self) -> HashMap<String, PathBuf> {
        let cache = self.http.config().avatar_cache.clone();
        if let Err(e) = tokio::fs::create_dir_all(&cache).await {
            tracing::warn!(dir = %cache.display(), error = %e, "cannot create avatar cache");
            return HashMap::new();
        }

        let mut files = HashMap::new();
        for (index, url) in self.queue.iter().enumerate() {
            match self.download(url, &cache, index).await {
                Ok(path) => {
                    files.insert(url.clone(), path);
                }
                Err(e) => tracing::warn!(url = %url, error = %e, "avatar download failed"),
            }
        }
        files
    }

    async fn download(&self, url: &str, cache: &Path, index: usize) -> Result<PathBuf, GDataError> {
        let req = self.http.build_request(reqwest::Method::GET, url);
        let resp = self.http.execute(req).await?;
        let bytes = resp.bytes().await?;

        let path = cache.join(cache_file_name(url, index));
        tokio::fs::write(&path, &bytes).await?;
        tracing::debug!(url = %url, file = %path.display(), "avatar downloaded");
        Ok(path)
    }
}

/// Cache file name for a photo URL: the sanitized last path segment,
/// or a positional name when nothing of it survives.
fn cache_file_name(url: &str, index: usize) -> String {
    let tail = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let name: String = tail
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    if name.is_empty() {
        format!("avatar-{index}")
    } else {
        name
    }
}
