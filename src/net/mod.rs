//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerConfig (host, PORT)
//!     → listener.rs (parse address, bind)
//!     → Hand off to HTTP layer (axum::serve)
//! ```

pub mod listener;

pub use listener::{bind, ListenerError};
