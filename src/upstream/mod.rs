//! Outbound HTTP calls.
//!
//! A single best-effort GET against a fixed endpoint. No timeout, retry or
//! circuit breaking: a hung upstream holds only the request that awaits it.

use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("{url} returned an unparseable body: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Client for the joke endpoint.
#[derive(Clone)]
pub struct JokeClient {
    http: Client,
    url: String,
}

impl JokeClient {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    /// Fetch one joke and return the upstream JSON payload untouched.
    pub async fn fetch(&self) -> Result<Value, UpstreamError> {
        tracing::debug!(url = %self.url, "Fetching joke");

        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|source| UpstreamError::Decode {
                url: self.url.clone(),
                source,
            })
    }
}
