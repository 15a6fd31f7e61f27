//! Ordered request pipeline.
//!
//! # Data Flow
//! ```text
//! Request
//!     → run_pipeline (buffer body, build RequestContext)
//!     → body::JsonBodyParser
//!     → security::cors::CorsPolicy
//!     → security::headers::SecurityHeaders
//!     → security::rate_limit::RateLimiter
//!     → Router
//! ```
//!
//! Each stage returns [`Flow::Continue`] or [`Flow::Respond`]. The runner
//! stops at the first `Respond`. Headers staged on the context by any stage
//! that ran are attached to the final response, whoever produced it.

pub mod body;
pub mod context;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use http_body_util::LengthLimitError;

use crate::http::error::ApiError;

pub use body::{JsonBodyParser, ParsedJson};
pub use context::RequestContext;

/// Outcome of a single stage.
pub enum Flow {
    /// Hand the request to the next stage.
    Continue,
    /// Terminate the chain with this response.
    Respond(Response),
}

impl From<ApiError> for Flow {
    fn from(err: ApiError) -> Self {
        Flow::Respond(err.into_response())
    }
}

/// A request inspector/transformer.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    fn handle(&self, ctx: &mut RequestContext) -> Flow;
}

/// Stages executed in insertion order.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    max_body_bytes: usize,
}

impl Pipeline {
    pub fn new(max_body_bytes: usize) -> Self {
        Self {
            stages: Vec::new(),
            max_body_bytes,
        }
    }

    pub fn with_stage<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run the stages. `Some` means a stage short-circuited.
    pub fn run(&self, ctx: &mut RequestContext) -> Option<Response> {
        for stage in &self.stages {
            if let Flow::Respond(response) = stage.handle(ctx) {
                tracing::debug!(
                    stage = stage.name(),
                    status = %response.status(),
                    path = %ctx.path,
                    "Pipeline short-circuited"
                );
                return Some(response);
            }
        }
        None
    }
}

/// Axum middleware driving the [`Pipeline`] in front of the router.
pub async fn run_pipeline(
    State(pipeline): State<Arc<Pipeline>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let (mut parts, body) = request.into_parts();
    let bytes = match read_body(body, pipeline.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => return err.into_response(),
    };

    let mut ctx = RequestContext::new(
        parts.method.clone(),
        parts.uri.path().to_string(),
        parts.headers.clone(),
        client,
        bytes,
    );

    if let Some(response) = pipeline.run(&mut ctx) {
        return with_staged_headers(response, ctx.response_headers);
    }

    let (bytes, json, staged) = ctx.into_forwarded();
    if let Some(value) = json {
        parts.extensions.insert(ParsedJson(value));
    }
    let response = next.run(Request::from_parts(parts, Body::from(bytes))).await;
    with_staged_headers(response, staged)
}

/// Buffer the body, telling an oversized body apart from a broken one.
async fn read_body(body: Body, limit: usize) -> Result<Bytes, ApiError> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| body_rejection(e, limit))
}

fn body_rejection(err: axum::Error, limit: usize) -> ApiError {
    let inner = err.into_inner();
    if inner.is::<LengthLimitError>() {
        tracing::debug!(limit, "Request body over limit");
        ApiError::PayloadTooLarge { limit }
    } else {
        tracing::debug!(error = %inner, "Failed to read request body");
        ApiError::BadRequest(UNREADABLE_BODY_MESSAGE.to_string())
    }
}

/// Body returned when the request body could not be read.
pub const UNREADABLE_BODY_MESSAGE: &str = "Unable to read request body.";

/// Staged headers win over anything the inner service set.
fn with_staged_headers(mut response: Response, staged: HeaderMap) -> Response {
    let headers = response.headers_mut();
    for name in staged.keys() {
        headers.remove(name);
        for value in staged.get_all(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    response
}
