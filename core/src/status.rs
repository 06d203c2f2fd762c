// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// Outcome of a sync operation, as seen across protocol seams.
///
/// Statuses travel where other layers would throw: the remote source
/// reports each fetch page and each commit with one, and the engine
/// finishes every session with one. `InProgress` is the only
/// non-terminal value; everything after `AuthFailure` describes a
/// failure class the host can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStatus {
    /// The operation completed.
    Done,
    /// More of the same operation follows (another fetch page, another
    /// batch page).
    InProgress,
    /// The service rejected the credentials.
    AuthFailure,
    /// The service could not be reached, or closed the connection
    /// before a usable response arrived.
    ConnectionError,
    /// The service failed internally (5xx).
    ServerFailure,
    /// The service rejected the request as malformed.
    BadRequest,
    /// The local store failed.
    DatabaseFailure,
    /// Any other failure.
    Error,
    /// The session was cancelled cooperatively.
    Aborted,
}

impl SyncStatus {
    /// Whether this status ends the operation it describes.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }

    /// Whether this status reports a failure.
    ///
    /// `Done` and `InProgress` are the only non-failures; `Aborted`
    /// counts as a failure because the session did not finish its work.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        !matches!(self, Self::Done | Self::InProgress)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Done => "done",
            Self::InProgress => "in progress",
            Self::AuthFailure => "authentication failure",
            Self::ConnectionError => "connection error",
            Self::ServerFailure => "server failure",
            Self::BadRequest => "bad request",
            Self::DatabaseFailure => "database failure",
            Self::Error => "error",
            Self::Aborted => "aborted",
        };
        text.fmt(f)
    }
}
