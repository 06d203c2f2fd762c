// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

/// Errors produced while decoding or encoding contact feeds.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum AtomError {
    /// XML parsing or writing error.
    #[error("XML error: {0}")]
    Xml(String),

    /// The document is well formed XML but not a contact feed.
    #[error("not a contact feed: {0}")]
    NotAFeed(String),
}

impl From<quick_xml::Error> for AtomError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e.to_string())
    }
}

impl From<std::io::Error> for AtomError {
    fn from(e: std::io::Error) -> Self {
        Self::Xml(format!("IO error: {e}"))
    }
}
