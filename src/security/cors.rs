//! Cross-origin resource sharing policy.
//!
//! `OPTIONS` requests are answered here with 204 and never reach the router.
//! Other requests get the allow-origin header staged and continue.

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::config::CorsConfig;
use crate::pipeline::{Flow, RequestContext, Stage};

#[derive(Debug, Clone)]
enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: AllowedOrigins,
    methods: HeaderValue,
}

impl CorsPolicy {
    pub fn from_config(config: &CorsConfig) -> Self {
        let origins = if config.allowed_origins.iter().any(|o| o == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(config.allowed_origins.clone())
        };

        let joined = config
            .allowed_methods
            .iter()
            .map(|m| m.to_ascii_uppercase())
            .collect::<Vec<_>>()
            .join(",");
        let methods = HeaderValue::from_str(&joined)
            .unwrap_or_else(|_| HeaderValue::from_static("GET,POST,PUT,DELETE"));

        Self { origins, methods }
    }

    /// Stage the allow-origin header (plus `Vary` for origin lists).
    fn stage_origin(&self, ctx: &mut RequestContext) {
        match &self.origins {
            AllowedOrigins::Any => {
                ctx.stage_header("access-control-allow-origin", HeaderValue::from_static("*"));
            }
            AllowedOrigins::List(list) => {
                let matched = ctx
                    .header_str(&header::ORIGIN)
                    .filter(|origin| list.iter().any(|o| o == origin))
                    .and_then(|origin| HeaderValue::from_str(origin).ok());
                if let Some(origin) = matched {
                    ctx.stage_header("access-control-allow-origin", origin);
                }
                ctx.append_header(header::VARY, HeaderValue::from_static("Origin"));
            }
        }
    }

    fn preflight(&self, ctx: &mut RequestContext) -> Response {
        self.stage_origin(ctx);
        ctx.stage_header("access-control-allow-methods", self.methods.clone());

        if let Some(requested) = ctx
            .headers
            .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
            .cloned()
        {
            ctx.stage_header("access-control-allow-headers", requested);
            ctx.append_header(
                header::VARY,
                HeaderValue::from_static("Access-Control-Request-Headers"),
            );
        }

        StatusCode::NO_CONTENT.into_response()
    }
}

impl Stage for CorsPolicy {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn handle(&self, ctx: &mut RequestContext) -> Flow {
        if ctx.method == Method::OPTIONS {
            return Flow::Respond(self.preflight(ctx));
        }
        self.stage_origin(ctx);
        Flow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::HeaderMap;

    fn request(method: Method, headers: &[(&'static str, &'static str)]) -> RequestContext {
        let mut map = HeaderMap::new();
        for &(k, v) in headers {
            map.insert(k, HeaderValue::from_static(v));
        }
        RequestContext::new(method, "/api/joke".into(), map, None, Bytes::new())
    }

    #[test]
    fn test_wildcard_allows_any_origin() {
        let policy = CorsPolicy::from_config(&CorsConfig::default());
        let mut ctx = request(Method::GET, &[("origin", "https://evil.example")]);

        assert!(matches!(policy.handle(&mut ctx), Flow::Continue));
        assert_eq!(ctx.response_headers["access-control-allow-origin"], "*");
    }

    #[test]
    fn test_preflight_advertises_declared_methods_only() {
        let policy = CorsPolicy::from_config(&CorsConfig::default());
        let mut ctx = request(
            Method::OPTIONS,
            &[
                ("origin", "https://app.example"),
                ("access-control-request-method", "PATCH"),
                ("access-control-request-headers", "content-type,x-token"),
            ],
        );

        let response = match policy.handle(&mut ctx) {
            Flow::Respond(r) => r,
            Flow::Continue => panic!("preflight must be answered"),
        };
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let methods = ctx.response_headers["access-control-allow-methods"]
            .to_str()
            .unwrap();
        assert_eq!(methods, "GET,POST,PUT,DELETE");
        assert!(!methods.contains("PATCH"));
        assert_eq!(
            ctx.response_headers["access-control-allow-headers"],
            "content-type,x-token"
        );
    }

    #[test]
    fn test_origin_list_only_echoes_listed_origins() {
        let policy = CorsPolicy::from_config(&CorsConfig {
            allowed_origins: vec!["https://app.example".into()],
            ..CorsConfig::default()
        });

        let mut allowed = request(Method::GET, &[("origin", "https://app.example")]);
        policy.handle(&mut allowed);
        assert_eq!(
            allowed.response_headers["access-control-allow-origin"],
            "https://app.example"
        );
        assert_eq!(allowed.response_headers[header::VARY], "Origin");

        let mut denied = request(Method::GET, &[("origin", "https://other.example")]);
        policy.handle(&mut denied);
        assert!(!denied
            .response_headers
            .contains_key("access-control-allow-origin"));
    }
}
