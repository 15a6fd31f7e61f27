//! JSON body parsing stage.

use axum::http::header;
use serde_json::Value;

use crate::http::error::ApiError;
use crate::pipeline::{Flow, RequestContext, Stage};

pub const MALFORMED_JSON_MESSAGE: &str = "Malformed JSON in request body.";

/// Parsed JSON body, exposed to handlers as a request extension.
#[derive(Debug, Clone)]
pub struct ParsedJson(pub Value);

/// Parses `application/json` bodies; anything else passes untouched.
#[derive(Debug, Default)]
pub struct JsonBodyParser;

impl JsonBodyParser {
    fn is_json(content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        essence == "application/json"
            || (essence.starts_with("application/") && essence.ends_with("+json"))
    }
}

impl Stage for JsonBodyParser {
    fn name(&self) -> &'static str {
        "body_parser"
    }

    fn handle(&self, ctx: &mut RequestContext) -> Flow {
        let is_json = ctx
            .header_str(&header::CONTENT_TYPE)
            .is_some_and(Self::is_json);
        if !is_json || ctx.body.is_empty() {
            return Flow::Continue;
        }

        match serde_json::from_slice::<Value>(&ctx.body) {
            Ok(value) => {
                ctx.json = Some(value);
                Flow::Continue
            }
            Err(e) => {
                tracing::debug!(path = %ctx.path, error = %e, "Malformed JSON body");
                ApiError::BadRequest(MALFORMED_JSON_MESSAGE.to_string()).into()
            }
        }
    }
}
