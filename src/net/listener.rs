//! TCP listener setup.
//!
//! Binds the configured host and port. Hostnames are resolved by the bind
//! call itself. No connection cap: the rate limiter is the only admission
//! control.

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Bind to the configured `host:port`.
pub async fn bind(config: &ListenerConfig) -> Result<TcpListener, ListenerError> {
    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| ListenerError::Bind {
            address: address.clone(),
            source,
        })?;

    tracing::debug!(address = %address, "Listener bound");
    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let config = ListenerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        };
        let listener = bind(&config).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_resolves_hostname() {
        let config = ListenerConfig {
            host: "localhost".into(),
            port: 0,
        };
        let listener = bind(&config).await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_bind_error() {
        let config = ListenerConfig {
            host: "no-such-host.invalid".into(),
            port: 0,
        };
        match bind(&config).await {
            Err(ListenerError::Bind { address, .. }) => {
                assert_eq!(address, "no-such-host.invalid:0");
            }
            Ok(_) => panic!("bind to an unresolvable host must fail"),
        }
    }
}
