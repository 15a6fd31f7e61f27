//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tower layers)
//!     → pipeline (body, CORS, security headers, rate limit)
//!     → handlers.rs (status, health, joke)
//!     → error.rs (ApiError → uniform JSON response)
//!     → Send to client
//! ```

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, HttpServer};
