//! Centralized error handling.
//!
//! Every failure that leaves a handler or pipeline stage is an [`ApiError`].
//! Client errors carry their own message. Server-side failures are logged
//! and rendered as one opaque 500 body, so internal detail never reaches
//! the client.

use std::any::Any;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::observability::metrics;
use crate::upstream::UpstreamError;

/// Body returned for every server-side failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Something went wrong on the server.";

/// Body returned when a client exceeds its quota.
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests, please try again later.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("rate limit exceeded")]
    RateLimited { retry_after: Duration },

    #[error("upstream call failed: {0}")]
    UpstreamFailure(#[from] UpstreamError),

    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::UpstreamFailure(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::BadRequest(ref msg) => {
                (status, Json(ErrorBody { error: msg })).into_response()
            }
            ApiError::PayloadTooLarge { .. } => {
                let msg = self.to_string();
                (status, Json(ErrorBody { error: &msg })).into_response()
            }
            ApiError::RateLimited { retry_after } => {
                let mut response =
                    (status, Json(ErrorBody { error: RATE_LIMITED_MESSAGE })).into_response();
                let secs = retry_after.as_secs_f64().ceil() as u64;
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
                response
            }
            ApiError::UpstreamFailure(_) | ApiError::Internal(_) => {
                if matches!(self, ApiError::UpstreamFailure(_)) {
                    metrics::record_upstream_failure();
                }
                tracing::error!(error = %self, "Request failed");
                internal_error_response()
            }
        }
    }
}

/// The uniform 500 response.
pub fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: INTERNAL_ERROR_MESSAGE,
        }),
    )
        .into_response()
}

/// Panic handler for `CatchPanicLayer`: log the payload, hide it from the client.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = %detail, "Handler panicked");
    internal_error_response()
}
