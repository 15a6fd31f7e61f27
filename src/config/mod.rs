//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env (dotenvy)
//!     → MINE_CONFIG file (TOML, optional)
//!     → loader.rs (parse, apply HOST/PORT overrides)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults so the service runs with no config file
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    AppConfig, CorsConfig, ListenerConfig, ObservabilityConfig, RateLimitConfig, RuntimeConfig,
    SecurityConfig, UpstreamConfig,
};
