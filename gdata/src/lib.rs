// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! GData contacts service adapter.
//!
//! Implements [`absync_core::RemoteSource`] against a GData-style
//! contacts API: paged feed downloads, batched uploads and the photo
//! side channel, speaking the Atom wire format from [`absync_atom`].

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

mod avatar;
mod client;
mod config;
mod error;
mod http;
mod request;

pub use crate::client::GDataClient;
pub use crate::config::{AuthMethod, GDataConfig};
pub use crate::error::GDataError;
