// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use absync_core::SyncStatus;

/// GData client errors.
#[non_exhaustive]
#[derive(Debug)]
pub enum GDataError {
    /// Transport-level failure, no usable HTTP response.
    Connection(String),

    /// Non-success HTTP status.
    Status {
        /// HTTP status code.
        code: u16,
        /// Response body, if it could be read.
        body: String,
    },

    /// Empty response body where a feed was expected.
    EmptyBody,

    /// Atom feed parsing/writing error.
    Atom(String),

    /// Local file error while handling avatars.
    Io(String),
}

impl GDataError {
    /// Classifies the error as a protocol status.
    #[must_use]
    pub fn sync_status(&self) -> SyncStatus {
        match self {
            Self::Connection(_) | Self::EmptyBody => SyncStatus::ConnectionError,
            Self::Status { code, .. } => match *code {
                400 => SyncStatus::BadRequest,
                401 => SyncStatus::AuthFailure,
                500..=599 => SyncStatus::ServerFailure,
                _ => SyncStatus::Error,
            },
            Self::Atom(_) | Self::Io(_) => SyncStatus::Error,
        }
    }
}

impl fmt::Display for GDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(e) => write!(f, "Connection error: {e}"),
            Self::Status { code, body } => write!(f, "HTTP {code}: {body}"),
            Self::EmptyBody => write!(f, "Empty response body"),
            Self::Atom(e) => write!(f, "Atom feed error: {e}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for GDataError {}

impl From<reqwest::Error> for GDataError {
    fn from(e: reqwest::Error) -> Self {
        Self::Connection(e.to_string())
    }
}

impl From<absync_atom::AtomError> for GDataError {
    fn from(e: absync_atom::AtomError) -> Self {
        Self::Atom(e.to_string())
    }
}

impl From<quick_xml::Error> for GDataError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Atom(e.to_string())
    }
}

impl From<std::io::Error> for GDataError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
