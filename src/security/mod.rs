//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (after body parsing):
//!     → cors.rs (answer preflight, stage allow-origin)
//!     → headers.rs (stage hardening headers)
//!     → rate_limit.rs (per-IP fixed window)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Every stage is a `pipeline::Stage`; none of them touch the router
//! - Rejections are answered locally and never reach the error sink

pub mod cors;
pub mod headers;
pub mod rate_limit;

pub use cors::CorsPolicy;
pub use headers::SecurityHeaders;
pub use rate_limit::{CounterStore, Decision, MemoryStore, RateLimiter, WindowPolicy};
