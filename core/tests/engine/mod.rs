// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! End-to-end sync session tests.
//!
//! These tests drive a [`absync_core::SyncEngine`] over the in-memory
//! store and a scripted remote source, and check what each side holds
//! once the session finishes.

mod conflicts;
mod failures;
mod fast_sync;
mod slow_sync;
