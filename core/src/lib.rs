// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Two-way contact synchronization engine.
//!
//! The engine reconciles a local contacts store against a remote
//! service: it fetches the remote changes, resolves conflicts, applies
//! the survivors locally and pushes the local changes back, all in one
//! session. It is generic over both sides: [`LocalStore`] is the seam
//! to the platform address book, [`RemoteSource`] the seam to the
//! service protocol.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(
    clippy::option_option,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::match_bool
)]

mod abort;
mod engine;
mod memory;
mod report;
mod session;
mod source;
mod status;
mod store;

pub use absync_atom::{ContactRecord, LocalId, RemoteId, StructuredName, VersionTag};

pub use crate::abort::AbortFlag;
pub use crate::engine::{SyncEngine, SyncPhase};
pub use crate::memory::MemoryStore;
pub use crate::report::{ItemCounts, SyncReport};
pub use crate::session::{ConflictPolicy, SyncConfig, SyncDirection, SyncMode};
pub use crate::source::{
    BatchOp, BatchQueue, CommitOutcome, FetchPage, FetchQuery, RemoteSource, SourceSession,
};
pub use crate::status::SyncStatus;
pub use crate::store::{IdPair, ItemStatus, LocalStore, StoreError};
