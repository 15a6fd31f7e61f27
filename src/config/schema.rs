//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the backend.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Default required runtime version.
pub const DEFAULT_REQUIRED_VERSION: &str = "22.17.0";

/// Default upstream joke endpoint.
pub const DEFAULT_JOKE_URL: &str = "https://official-joke-api.appspot.com/jokes/random";

/// Root configuration for the backend.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (host, port).
    pub listener: ListenerConfig,

    /// Runtime version lock.
    pub runtime: RuntimeConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Security hardening settings.
    pub security: SecurityConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Outbound calls.
    pub upstream: UpstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind.
    pub host: String,

    /// TCP port. `PORT` overrides it.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl ListenerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Version the binary must report at startup.
    pub required_version: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            required_version: DEFAULT_REQUIRED_VERSION.to_string(),
        }
    }
}

/// CORS policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins. `"*"` allows any origin.
    // TODO: replace the wildcard default with the deployed frontend origins.
    pub allowed_origins: Vec<String>,

    /// Methods advertised on preflight responses.
    pub allowed_methods: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: ["GET", "POST", "PUT", "DELETE"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Content-Security-Policy value. Header omitted when unset.
    pub content_security_policy: Option<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            content_security_policy: None,
            max_body_bytes: 100 * 1024, // 100KB
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Fixed window length in seconds.
    pub window_secs: u64,

    /// Requests allowed per identity per window.
    pub max_requests: u32,

    /// How often expired windows are evicted from memory.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 10 * 60,
            max_requests: 200,
            sweep_interval_secs: 60,
        }
    }
}

/// Outbound call configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Endpoint fetched by `/api/joke`.
    pub joke_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            joke_url: DEFAULT_JOKE_URL.to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
