// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::ops::Deref;

/// Local contact identifier.
///
/// A `LocalId` is assigned by the local contacts store and is stable for the
/// contact's local lifetime. It doubles as the correlation token
/// (`batch:id`) on every wire batch operation, so asynchronous per-item
/// results can be matched back to the record that caused them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalId(String);

impl LocalId {
    /// Creates a new `LocalId` from a string.
    #[must_use]
    pub const fn new(id: String) -> Self {
        Self(id)
    }

    /// Returns the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for LocalId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for LocalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for LocalId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for LocalId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Remote contact identifier.
///
/// A `RemoteId` is assigned by the remote service when a contact is first
/// created there. A record without one has never been created remotely and
/// is classified as a create when pushed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RemoteId(String);

impl RemoteId {
    /// Creates a new `RemoteId` from a string.
    #[must_use]
    pub const fn new(id: String) -> Self {
        Self(id)
    }

    /// Returns the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for RemoteId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for RemoteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RemoteId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RemoteId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Version tag for optimistic concurrency.
///
/// A `VersionTag` is the opaque etag the remote service attaches to a
/// record. Updates and deletes carry the last-known tag as a precondition;
/// the service may reject the operation when the tag is stale or absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTag(String);

impl VersionTag {
    /// Creates a new `VersionTag` from a string.
    #[must_use]
    pub const fn new(tag: String) -> Self {
        Self(tag)
    }

    /// Returns the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for VersionTag {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for VersionTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for VersionTag {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

impl From<&str> for VersionTag {
    fn from(tag: &str) -> Self {
        Self(tag.to_string())
    }
}
