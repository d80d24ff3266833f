//! Error types for the CoAP client

use otcoap_coap::CodecError;
use otcoap_core::{AddressError, ConfigError};
use std::net::SocketAddr;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// No matching response arrived in time
    #[error("No response from {target} within {timeout_ms} ms")]
    Timeout { target: SocketAddr, timeout_ms: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The peer rejected the request with a Reset
    #[error("Request to {0} was reset by the peer")]
    Reset(SocketAddr),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Returns true if the exchange ended because nothing answered.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout { .. })
    }
}
