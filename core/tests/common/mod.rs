// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Common test utilities for integration tests.
//!
//! This module provides shared test infrastructure including:
//! - Test data factories (fixtures)
//! - A scriptable remote source with a shared operation log

mod fixtures;
mod mock_source;

#[allow(unused_imports)]
pub use fixtures::{
    fast_config, local_contact, page, remote_contact, remote_tombstone, slow_config,
};
#[allow(unused_imports)]
pub use mock_source::MockSource;
