// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Parse and emit GData Atom contact feeds.

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

pub mod contact;
mod error;
mod reader;
pub mod schema;
mod types;
mod writer;
pub mod xml;

pub use crate::contact::{
    Anniversary, Avatar, ContactRecord, Email, ExtendedProperty, ImHandle, Note, Organization,
    Phone, PostalAddress, Relation, StructuredName, Website,
};
pub use crate::error::AtomError;
pub use crate::reader::{BatchResponse, ContactFeed, parse_feed};
pub use crate::schema::{
    Context, EventLabel, Gender, ImProtocol, PhoneKind, RelationKind, WebsiteKind,
};
pub use crate::types::{LocalId, RemoteId, VersionTag};
pub use crate::writer::{BatchEntry, BatchKind, FeedWriter};
