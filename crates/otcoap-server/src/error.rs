//! Error types for the CoAP server

use std::net::SocketAddr;
use thiserror::Error;

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors that stop the server
#[derive(Debug, Error)]
pub enum ServerError {
    /// The UDP socket could not be bound
    #[error("Failed to bind CoAP server to {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Receiving on the socket failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
