// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Feed query builder.

use jiff::Timestamp;

/// Contacts feed page query.
///
/// Collects the parameters of one feed page request and renders the
/// request URL.
#[derive(Debug, Clone)]
pub(crate) struct FetchRequest {
    feed_url: String,
    updated_min: Option<Timestamp>,
    max_results: Option<usize>,
    start_index: Option<usize>,
    show_deleted: bool,
}

impl FetchRequest {
    /// Creates a query for the given feed URL.
    pub fn new(feed_url: impl Into<String>) -> Self {
        Self {
            feed_url: feed_url.into(),
            updated_min: None,
            max_results: None,
            start_index: None,
            show_deleted: false,
        }
    }

    /// Only entries updated at or after the given instant.
    #[must_use]
    pub fn updated_min(mut self, ts: Timestamp) -> Self {
        self.updated_min = Some(ts);
        self
    }

    /// Page size cap.
    #[must_use]
    pub fn max_results(mut self, n: usize) -> Self {
        self.max_results = Some(n);
        self
    }

    /// One-based index of the first entry to return.
    #[must_use]
    pub fn start_index(mut self, index: usize) -> Self {
        self.start_index = Some(index);
        self
    }

    /// Whether the server should include deleted entries.
    #[must_use]
    pub fn show_deleted(mut self, yes: bool) -> Self {
        self.show_deleted = yes;
        self
    }

    /// Renders the feed URL with all collected query parameters.
    pub fn build_url(&self) -> String {
        let mut params = Vec::new();
        if let Some(ts) = self.updated_min {
            params.push(format!("updated-min={}", format_timestamp(ts)));
        }
        if let Some(n) = self.max_results {
            params.push(format!("max-results={n}"));
        }
        if let Some(index) = self.start_index {
            params.push(format!("start-index={index}"));
        }
        if self.show_deleted {
            params.push("showdeleted=true".to_string());
        }

        if params.is_empty() {
            return self.feed_url.clone();
        }
        let sep = if self.feed_url.contains('?') { '&' } else { '?' };
        format!("{}{sep}{}", self.feed_url, params.join("&"))
    }
}

/// Second-precision wire timestamp, as the query parameters expect it.
pub(crate) fn format_timestamp(ts: Timestamp) -> String {
    ts.strftime("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_url_when_no_parameters() {
        let req = FetchRequest::new("https://example.com/feed");
        assert_eq!(req.build_url(), "https://example.com/feed");
    }

    #[test]
    fn all_parameters_in_order() {
        let ts = Timestamp::from_second(1_700_000_000).unwrap();
        let url = FetchRequest::new("https://example.com/feed")
            .updated_min(ts)
            .max_results(30)
            .start_index(31)
            .show_deleted(true)
            .build_url();
        assert_eq!(
            url,
            "https://example.com/feed?updated-min=2023-11-14T22:13:20Z\
             &max-results=30&start-index=31&showdeleted=true"
        );
    }

    #[test]
    fn appends_to_existing_query() {
        let url = FetchRequest::new("https://example.com/feed?alt=atom")
            .max_results(10)
            .build_url();
        assert_eq!(url, "https://example.com/feed?alt=atom&max-results=10");
    }
}
