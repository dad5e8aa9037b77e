//! TCP listener binding.
//!
//! # Responsibilities
//! - Resolve the configured host/port into a socket address
//! - Bind the plain TCP listener
//! - Describe every way serving can fail
//!
//! # Design Decisions
//! - Bind failures are returned to the caller, never retried

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The configured address could not be parsed.
    #[error("Invalid bind address {address}: {source}")]
    Address {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    Bind(#[source] std::io::Error),

    /// Failed to load the certificate or key.
    #[error("Failed to load TLS configuration: {0}")]
    Tls(#[source] std::io::Error),

    /// The server stopped with an error after binding.
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Socket address for the configured host and port.
pub fn socket_addr(config: &ListenerConfig) -> Result<SocketAddr, ListenerError> {
    let address = format!("{}:{}", config.host, config.port);
    address
        .parse()
        .map_err(|source| ListenerError::Address { address, source })
}

/// Bind a TCP listener for the configured host and port.
pub async fn bind(config: &ListenerConfig) -> Result<TcpListener, ListenerError> {
    let addr = socket_addr(config)?;
    let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
    let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

    tracing::info!(address = %local_addr, "Listener bound");
    Ok(listener)
}
