//! Shared HTTP GET + JSON decoding used by every upstream call
//!
//! Uses async reqwest; the transport (direct or proxied) is chosen once when
//! the fetcher is built, never per call site.

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Proxy, StatusCode};
use serde::de::DeserializeOwned;

const CLIENT_USER_AGENT: &str = "steam_inventory/0.1";

/// How outgoing requests reach the network
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Transport {
    /// Plain TCP from this host
    #[default]
    Direct,
    /// Through a proxy, e.g. `socks5h://127.0.0.1:9050` or `http://proxy:3128`
    Proxied(String),
}

/// Failure of a single upstream request
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("request timed out")]
    Timeout(#[source] reqwest::Error),
    #[error("HTTP error: {0}")]
    Status(StatusCode),
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("upstream reported failure: {0}")]
    Rejected(String),
}

impl FetchError {
    fn from_send(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err)
        } else {
            FetchError::Network(err)
        }
    }

    fn from_body(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err)
        } else {
            FetchError::Body(err)
        }
    }

    /// Whether repeating the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::Timeout(_) => true,
            FetchError::Status(status) => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            FetchError::Client(_)
            | FetchError::Body(_)
            | FetchError::Decode(_)
            | FetchError::Rejected(_) => false,
        }
    }
}

/// HTTP client for JSON endpoints.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct JsonFetcher {
    client: Client,
}

impl JsonFetcher {
    /// Build a fetcher with a per-request timeout and the given transport
    pub fn new(transport: &Transport, timeout: Duration) -> Result<Self, FetchError> {
        let mut builder = Client::builder().timeout(timeout);
        if let Transport::Proxied(address) = transport {
            log::debug!("Routing upstream requests through proxy {}", address);
            builder = builder.proxy(Proxy::all(address).map_err(FetchError::Client)?);
        }
        let client = builder.build().map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    /// GET `url` and return the full body of a 2xx response.
    ///
    /// The body is read to the end on every path, so the connection goes
    /// back to the pool even when the status is an error.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        log::debug!("GET {}", redact_url(url));

        let response = self
            .client
            .get(url)
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await
            .map_err(FetchError::from_send)?;

        let status = response.status();
        let body = response.bytes().await.map_err(FetchError::from_body)?;

        if !status.is_success() {
            log::debug!(
                "GET {} returned {} ({} bytes discarded)",
                redact_url(url),
                status,
                body.len()
            );
            return Err(FetchError::Status(status));
        }

        Ok(body.to_vec())
    }

    /// GET `url` and decode the body as `T`
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let body = self.fetch_bytes(url).await?;
        serde_json::from_slice(&body).map_err(FetchError::Decode)
    }
}

/// Mask the value of a `key` query parameter for logging
pub fn redact_url(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let params: Vec<String> = query
        .split('&')
        .map(|param| match param.split_once('=') {
            Some(("key", _)) => "key=***".to_string(),
            _ => param.to_string(),
        })
        .collect();
    format!("{}?{}", base, params.join("&"))
}

#[cfg(test)]
#[path = "fetcher_tests.rs"]
mod tests;
