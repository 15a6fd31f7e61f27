//! Per-request state shared by pipeline stages.

use std::net::IpAddr;

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::Value;

/// Identity used when the peer address is unknown.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Transient view of one request, dropped once the response is sent.
#[derive(Debug)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub client: Option<IpAddr>,
    pub body: Bytes,
    /// Set by the body parser when the request carried JSON.
    pub json: Option<Value>,
    /// Headers to attach to whatever response ends up being sent.
    pub response_headers: HeaderMap,
}

impl RequestContext {
    pub fn new(
        method: Method,
        path: String,
        headers: HeaderMap,
        client: Option<IpAddr>,
        body: Bytes,
    ) -> Self {
        Self {
            method,
            path,
            headers,
            client,
            body,
            json: None,
            response_headers: HeaderMap::new(),
        }
    }

    /// Key used for per-client bookkeeping.
    pub fn client_identity(&self) -> String {
        self.client
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }

    pub fn header_str(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Replace any staged value for `name`.
    pub fn stage_header(&mut self, name: &'static str, value: HeaderValue) {
        self.response_headers
            .insert(HeaderName::from_static(name), value);
    }

    /// Add a value for `name`, keeping earlier ones.
    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.response_headers.append(name, value);
    }

    /// Split into what the router needs after the pipeline passed.
    pub fn into_forwarded(self) -> (Bytes, Option<Value>, HeaderMap) {
        (self.body, self.json, self.response_headers)
    }
}
