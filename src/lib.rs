//! Mine App backend library.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod pipeline;
pub mod security;
pub mod upstream;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
