// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use jiff::Timestamp;

use crate::status::SyncStatus;

/// Added/modified/deleted tallies for one side of the sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemCounts {
    /// Contacts added on this side.
    pub added: u32,
    /// Contacts modified on this side.
    pub modified: u32,
    /// Contacts deleted on this side.
    pub deleted: u32,
}

impl ItemCounts {
    /// Total number of processed items.
    #[must_use]
    pub const fn total(self) -> u32 {
        self.added + self.modified + self.deleted
    }
}

/// What one session did, built for every terminal status.
///
/// An aborted or failed session still reports the work that finished
/// before it stopped.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Name of the sync target.
    pub target: String,
    /// Changes applied to the local store.
    pub local: ItemCounts,
    /// Changes pushed to the remote service.
    pub remote: ItemCounts,
    /// The session's terminal status.
    pub status: SyncStatus,
    /// When the session finished.
    pub finished_at: Timestamp,
}

impl SyncReport {
    /// Whether the session finished all its work.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == SyncStatus::Done
    }
}
