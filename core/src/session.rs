// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::fmt;

use absync_atom::{LocalId, RemoteId};
use jiff::{Span, Timestamp};

use crate::report::ItemCounts;
use crate::store::IdPair;

/// Sync direction. Only two-way sync is supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
pub enum SyncDirection {
    /// Changes flow both ways.
    #[serde(rename = "two-way")]
    #[default]
    TwoWay,
}

/// Which side wins when both sides changed the same contact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
pub enum ConflictPolicy {
    /// The remote copy wins; the local change is discarded.
    #[serde(rename = "server-wins")]
    #[default]
    ServerWins,
    /// The local copy wins; the remote change is discarded.
    #[serde(rename = "client-wins")]
    ClientWins,
}

/// Configuration of one sync session.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SyncConfig {
    /// Name of the sync target, used in logs and the report.
    pub target: String,
    /// Account name on the remote service.
    pub account: String,
    /// Bearer token for the remote service. Acquiring and refreshing it
    /// is the host's job; an empty token fails the session early.
    #[serde(default)]
    pub auth_token: String,
    /// Sync direction.
    #[serde(default)]
    pub direction: SyncDirection,
    /// Conflict resolution policy.
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
    /// When the last successful session finished. `None` forces a slow
    /// sync.
    #[serde(default)]
    pub last_sync: Option<Timestamp>,
}

impl SyncConfig {
    /// Creates a config with defaults for everything but the target and
    /// account.
    #[must_use]
    pub fn new(target: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            account: account.into(),
            auth_token: String::new(),
            direction: SyncDirection::default(),
            conflict_policy: ConflictPolicy::default(),
            last_sync: None,
        }
    }

    /// The instant local and remote deltas are computed against.
    ///
    /// Padded three seconds past the recorded finish time: the service
    /// reports second-granular timestamps, and without the pad the
    /// previous session's own writes would show up in the next delta.
    #[must_use]
    pub fn since(&self) -> Option<Timestamp> {
        self.last_sync.map(|t| t + Span::new().seconds(3))
    }
}

/// Whether this session walks the full data set or only deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// First session against this target: fetch everything, push
    /// everything.
    Slow,
    /// Delta session against a recorded last-sync time.
    Fast,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slow => "slow".fmt(f),
            Self::Fast => "fast".fmt(f),
        }
    }
}

/// Mutable state of one running session.
///
/// The local delta maps double as the conflict table: conflict
/// resolution removes entries the remote side won, and whatever is left
/// gets pushed.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    /// Pre-fetch snapshot of all local ids (slow sync only). This is
    /// the push set: records fetched and stored during the session must
    /// not be echoed back.
    pub snapshot: Vec<LocalId>,
    /// Locally added contacts.
    pub local_added: Vec<IdPair>,
    /// Locally modified contacts that have a remote id, keyed by it.
    pub local_modified: HashMap<RemoteId, LocalId>,
    /// Locally modified contacts that were never synced; pushed as
    /// creates.
    pub local_modified_unsynced: Vec<LocalId>,
    /// Locally deleted contacts that have a remote id, keyed by it.
    pub local_deleted: HashMap<RemoteId, LocalId>,
    /// Local-side tallies.
    pub local_counts: ItemCounts,
    /// Remote-side tallies.
    pub remote_counts: ItemCounts,
}

impl SessionState {
    pub(crate) fn load_deltas(
        &mut self,
        added: Vec<IdPair>,
        modified: Vec<IdPair>,
        deleted: Vec<IdPair>,
    ) {
        self.local_added = added;
        for pair in modified {
            match pair.remote_id {
                Some(remote) => {
                    self.local_modified.insert(remote, pair.local_id);
                }
                None => self.local_modified_unsynced.push(pair.local_id),
            }
        }
        for pair in deleted {
            if let Some(remote) = pair.remote_id {
                self.local_deleted.insert(remote, pair.local_id);
            }
            // A deleted contact that never went remote needs no push;
            // the tombstone purge at the end covers it.
        }
    }
}
