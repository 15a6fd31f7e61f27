//! Route handlers.

use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::http::error::ApiError;
use crate::http::server::AppState;

pub const STATUS_OK: &str = "✅ OK";
pub const STATUS_HEALTHY: &str = "healthy";

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: String,
    pub uptime: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct JokeResponse {
    pub joke: Value,
}

/// `GET /`. Uptime counts from process start.
pub async fn root(State(state): State<AppState>) -> Json<StatusResponse> {
    let uptime = state.started_at.elapsed().as_secs_f64().round() as u64;

    Json(StatusResponse {
        status: STATUS_OK,
        message: format!(
            "🚀 Mine App Backend running on Node.js v{}",
            state.required_version
        ),
        uptime: format!("{uptime}s"),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: STATUS_HEALTHY,
        version: state.required_version.to_string(),
    })
}

/// `GET /api/joke`
pub async fn joke(State(state): State<AppState>) -> Result<Json<JokeResponse>, ApiError> {
    let joke = state.jokes.fetch().await?;
    Ok(Json(JokeResponse { joke }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use crate::upstream::JokeClient;

    fn state(started_at: Instant) -> AppState {
        AppState {
            started_at,
            required_version: Arc::from("22.17.0"),
            jokes: JokeClient::new(reqwest::Client::new(), "http://127.0.0.1:9/"),
        }
    }

    #[tokio::test]
    async fn test_root_reports_uptime_from_start() {
        let started_at = Instant::now()
            .checked_sub(Duration::from_secs(42))
            .expect("monotonic clock is past 42s");

        let Json(body) = root(State(state(started_at))).await;
        assert_eq!(body.uptime, "42s");
        assert_eq!(body.message, "🚀 Mine App Backend running on Node.js v22.17.0");
        assert_eq!(body.status, STATUS_OK);
    }

    #[tokio::test]
    async fn test_health_reports_required_version() {
        let Json(body) = health(State(state(Instant::now()))).await;
        assert_eq!(body.status, STATUS_HEALTHY);
        assert_eq!(body.version, "22.17.0");
    }
}
