//! Security response headers.
//!
//! Attaches a fixed hardening set to every response. Content-Security-Policy
//! is only sent when configured.

use axum::http::HeaderValue;

use crate::config::SecurityConfig;
use crate::pipeline::{Flow, RequestContext, Stage};

const HARDENING_HEADERS: &[(&str, &str)] = &[
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=31536000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

#[derive(Debug, Clone, Default)]
pub struct SecurityHeaders {
    content_security_policy: Option<HeaderValue>,
}

impl SecurityHeaders {
    pub fn from_config(config: &SecurityConfig) -> Self {
        let content_security_policy = config
            .content_security_policy
            .as_deref()
            .and_then(|csp| match HeaderValue::from_str(csp) {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(csp = %csp, "Ignoring invalid Content-Security-Policy");
                    None
                }
            });
        Self {
            content_security_policy,
        }
    }
}

impl Stage for SecurityHeaders {
    fn name(&self) -> &'static str {
        "security_headers"
    }

    fn handle(&self, ctx: &mut RequestContext) -> Flow {
        for &(name, value) in HARDENING_HEADERS {
            ctx.stage_header(name, HeaderValue::from_static(value));
        }
        if let Some(csp) = &self.content_security_policy {
            ctx.stage_header("content-security-policy", csp.clone());
        }
        Flow::Continue
    }
}
