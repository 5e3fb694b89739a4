// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Catalogue documents are small; anything slower than this is treated as a failure
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A fully buffered catalogue document
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    /// Whether the status is below 400 (redirects are followed by the client)
    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

/// Fetches show documents and feeds; mocked in tests
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error>;
}

/// [`HttpClient`] backed by a shared reqwest client
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Client identifying itself as podplay, with a request timeout
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self { client }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
        tracing::debug!(url, "Fetching catalogue document");

        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        tracing::debug!(url, status, bytes = body.len(), "Fetched catalogue document");
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> HttpResponse {
        HttpResponse {
            status,
            body: Bytes::new(),
        }
    }

    #[test]
    fn success_covers_ok_and_redirect_statuses() {
        assert!(response(200).is_success());
        assert!(response(304).is_success());
        assert!(!response(404).is_success());
        assert!(!response(503).is_success());
    }

    #[test]
    fn user_agent_names_the_crate() {
        assert!(USER_AGENT.starts_with("podplay/"));
    }

    #[test]
    fn client_is_shareable() {
        let client = ReqwestClient::new();
        let shared: std::sync::Arc<dyn HttpClient> = std::sync::Arc::new(client.clone());
        drop(shared);
        let _custom = ReqwestClient::with_client(reqwest::Client::new());
    }
}
