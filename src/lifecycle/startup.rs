//! Startup preconditions.
//!
//! The version lock runs before any socket is bound. A mismatch is fatal:
//! the process reports it and exits with code 1.

use std::sync::OnceLock;
use std::time::Instant;

use thiserror::Error;

/// Version of the running binary.
pub const RUNTIME_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit code used when a startup precondition fails.
pub const PRECONDITION_EXIT_CODE: i32 = 1;

static PROCESS_START: OnceLock<Instant> = OnceLock::new();

/// Instant the process started, fixed by the first call.
///
/// `main` calls this before anything else so uptime counts from launch.
pub fn process_started_at() -> Instant {
    *PROCESS_START.get_or_init(Instant::now)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Wrong runtime version! Required {required}, but running {current}")]
pub struct VersionMismatch {
    pub required: String,
    pub current: String,
}

/// Compare the running version against the required one (exact match).
pub fn check_version(current: &str, required: &str) -> Result<(), VersionMismatch> {
    if current == required {
        Ok(())
    } else {
        Err(VersionMismatch {
            required: required.to_string(),
            current: current.to_string(),
        })
    }
}

/// Enforce the version lock, terminating the process on mismatch.
pub fn enforce_version_lock(required: &str) {
    if let Err(e) = check_version(RUNTIME_VERSION, required) {
        tracing::error!(
            required = %e.required,
            current = %e.current,
            "Version lock failed"
        );
        eprintln!("{e}");
        std::process::exit(PRECONDITION_EXIT_CODE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_passes() {
        assert!(check_version("22.17.0", "22.17.0").is_ok());
        assert!(check_version(RUNTIME_VERSION, crate::config::schema::DEFAULT_REQUIRED_VERSION).is_ok());
    }

    #[test]
    fn test_mismatch_is_descriptive() {
        let err = check_version("22.16.1", "22.17.0").unwrap_err();
        assert_eq!(err.current, "22.16.1");
        assert_eq!(
            err.to_string(),
            "Wrong runtime version! Required 22.17.0, but running 22.16.1"
        );
    }

    #[test]
    fn test_process_start_is_fixed() {
        let first = process_started_at();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(process_started_at(), first);
        assert!(first <= Instant::now());
    }

    #[test]
    fn test_no_prefix_matching() {
        assert!(check_version("22.17.0", "22.17").is_err());
        assert!(check_version("v22.17.0", "22.17.0").is_err());
    }
}
