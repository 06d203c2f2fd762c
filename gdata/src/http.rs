// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP client wrapper with authentication and protocol headers.

use reqwest::{Client, RequestBuilder, Response};

use crate::config::{AuthMethod, GDataConfig};
use crate::error::GDataError;

/// Protocol version, sent with every request.
const GDATA_VERSION: &str = "3.0";

/// Content type of a batch feed POST.
pub(crate) const BATCH_CONTENT_TYPE: &str = "application/atom+xml; charset=UTF-8; type=feed";

/// HTTP client for GData operations.
#[derive(Debug)]
pub(crate) struct HttpClient {
    client: Client,
    config: GDataConfig,
    auth: AuthMethod,
}

impl HttpClient {
    /// Creates a new HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client creation fails.
    pub fn new(config: GDataConfig, auth: AuthMethod) -> Result<Self, GDataError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self {
            client,
            config,
            auth,
        })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &GDataConfig {
        &self.config
    }

    /// Builds a request with the version and authentication headers.
    ///
    /// `GData-Version` goes on first; the service falls back to a legacy
    /// response format when it is not the leading header.
    pub fn build_request(&self, method: reqwest::Method, url: &str) -> RequestBuilder {
        let mut req = self
            .client
            .request(method, url)
            .header("GData-Version", GDATA_VERSION);

        match &self.auth {
            AuthMethod::Basic { username, password } => {
                req = req.basic_auth(username, Some(password));
            }
            AuthMethod::Bearer { token } => {
                req = req.bearer_auth(token);
            }
            AuthMethod::None => {}
        }

        req
    }

    /// Executes a request and checks for HTTP errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or returns an error status code.
    pub async fn execute(&self, req: RequestBuilder) -> Result<Response, GDataError> {
        let resp = req.send().await?;

        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response".to_string());
            Err(GDataError::Status {
                code: status.as_u16(),
                body,
            })
        }
    }

    /// Adds the `If-Match: *` header mutating requests carry.
    pub fn if_match_any(req: RequestBuilder) -> RequestBuilder {
        req.header("If-Match", "*")
    }
}
