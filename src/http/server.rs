//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the three handlers
//! - Wire the request pipeline (body, CORS, headers, rate limit)
//! - Wire tower layers (request ID, tracing, panic catcher)
//! - Serve on a listener until shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::http::{error, handlers};
use crate::lifecycle::{self, shutdown};
use crate::observability::metrics;
use crate::pipeline::{run_pipeline, JsonBodyParser, Pipeline};
use crate::security::{CorsPolicy, CounterStore, MemoryStore, RateLimiter, SecurityHeaders, WindowPolicy};
use crate::upstream::JokeClient;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub started_at: Instant,
    pub required_version: Arc<str>,
    pub jokes: JokeClient,
}

/// HTTP server for the backend.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
    rate_limiter: Option<RateLimiter>,
}

impl HttpServer {
    /// Create a server with an in-memory rate limit store.
    pub fn new(config: AppConfig) -> Self {
        Self::with_counter_store(config, Arc::new(MemoryStore::new()))
    }

    /// Create a server counting requests in `store`.
    pub fn with_counter_store(config: AppConfig, store: Arc<dyn CounterStore>) -> Self {
        let state = AppState {
            started_at: lifecycle::process_started_at(),
            required_version: Arc::from(config.runtime.required_version.as_str()),
            jokes: JokeClient::new(reqwest::Client::new(), config.upstream.joke_url.clone()),
        };

        let rate_limiter = config
            .rate_limit
            .enabled
            .then(|| RateLimiter::new(store, WindowPolicy::from_config(&config.rate_limit)));

        let pipeline = Self::build_pipeline(&config, rate_limiter.clone());
        tracing::debug!(stages = ?pipeline.stage_names(), "Pipeline assembled");

        let router = Self::build_router(Self::routes(), state, Arc::new(pipeline));
        Self {
            router,
            config,
            rate_limiter,
        }
    }

    fn build_pipeline(config: &AppConfig, rate_limiter: Option<RateLimiter>) -> Pipeline {
        let pipeline = Pipeline::new(config.security.max_body_bytes)
            .with_stage(JsonBodyParser)
            .with_stage(CorsPolicy::from_config(&config.cors))
            .with_stage(SecurityHeaders::from_config(&config.security));

        match rate_limiter {
            Some(limiter) => pipeline.with_stage(limiter),
            None => pipeline,
        }
    }

    fn routes() -> Router<AppState> {
        Router::new()
            .route("/", get(handlers::root))
            .route("/health", get(handlers::health))
            .route("/api/joke", get(handlers::joke))
    }

    /// Wrap `routes` in every middleware layer.
    ///
    /// Handler panics are caught inside the pipeline, so the 500 carries the
    /// staged headers and is counted by `track_metrics`. The outer catcher
    /// only sees panics raised by the pipeline itself.
    fn build_router(routes: Router<AppState>, state: AppState, pipeline: Arc<Pipeline>) -> Router {
        routes
            .route_layer(CatchPanicLayer::custom(error::handle_panic))
            .route_layer(middleware::from_fn(track_metrics))
            .with_state(state)
            .layer(middleware::from_fn_with_state(pipeline, run_pipeline))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(CatchPanicLayer::custom(error::handle_panic)),
            )
    }

    /// The composed router, for driving the service without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown_rx` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!("Server running at http://localhost:{}", addr.port());

        let sweeper = self.rate_limiter.as_ref().map(|limiter| {
            limiter.spawn_sweeper(
                Duration::from_secs(self.config.rate_limit.sweep_interval_secs),
                shutdown_rx.resubscribe(),
            )
        });

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await?;

        if let Some(handle) = sweeper {
            handle.abort();
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn track_metrics(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_default();

    let response = next.run(request).await;
    metrics::record_request(&route, response.status().as_u16(), start);
    response
}
