// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use absync_atom::RemoteId;

/// GData authentication method.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(tag = "type")]
pub enum AuthMethod {
    /// No authentication.
    #[serde(rename = "none")]
    #[default]
    None,
    /// Basic authentication (username/password).
    #[serde(rename = "basic")]
    Basic {
        /// Username for authentication.
        username: String,
        /// Password for authentication.
        password: String,
    },
    /// Bearer token authentication (OAuth).
    #[serde(rename = "bearer")]
    Bearer {
        /// Bearer token.
        token: String,
    },
}

/// GData contacts service configuration.
///
/// Credentials are not part of the configuration; the bearer token
/// arrives with the [`SourceSession`](absync_core::SourceSession) when
/// the source is initialized.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct GDataConfig {
    /// Base URL of the contacts feed, without account or projection.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Base URL of the contact photo media endpoint.
    #[serde(default = "default_photo_url")]
    pub photo_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Maximum entries per feed page and per batch request.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Whether remote avatars are downloaded during a fetch.
    #[serde(default = "default_fetch_avatars")]
    pub fetch_avatars: bool,
    /// Directory downloaded avatars are cached in.
    #[serde(default = "default_avatar_cache")]
    pub avatar_cache: PathBuf,
}

impl GDataConfig {
    /// Full contacts feed URL for an account.
    #[must_use]
    pub fn feed_url(&self, account: &str) -> String {
        format!("{}/{account}/full", self.base_url.trim_end_matches('/'))
    }

    /// Batch endpoint URL for an account.
    #[must_use]
    pub fn batch_url(&self, account: &str) -> String {
        format!("{}/batch", self.feed_url(account))
    }

    /// Photo media URL for one contact.
    #[must_use]
    pub fn photo_media_url(&self, account: &str, remote_id: &RemoteId) -> String {
        format!(
            "{}/{account}/{remote_id}",
            self.photo_url.trim_end_matches('/')
        )
    }
}

fn default_base_url() -> String {
    "https://www.google.com/m8/feeds/contacts".to_string()
}

fn default_photo_url() -> String {
    "https://www.google.com/m8/feeds/photos/media".to_string()
}

const fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("absync-gdata/", env!("CARGO_PKG_VERSION")).to_string()
}

const fn default_page_size() -> usize {
    30
}

const fn default_fetch_avatars() -> bool {
    true
}

fn default_avatar_cache() -> PathBuf {
    std::env::temp_dir().join("absync-avatars")
}

impl Default for GDataConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            photo_url: default_photo_url(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            page_size: default_page_size(),
            fetch_avatars: default_fetch_avatars(),
            avatar_cache: default_avatar_cache(),
        }
    }
}
