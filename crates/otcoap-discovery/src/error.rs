//! Error types for the discovery service

use thiserror::Error;

/// Result type alias for discovery operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Errors that can occur during service discovery
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// mDNS service daemon failed to initialize
    #[error("Failed to initialize mDNS daemon: {0}")]
    MdnsInitFailed(String),

    /// Failed to browse for services
    #[error("Failed to browse for service type '{service_type}': {reason}")]
    BrowseFailed { service_type: String, reason: String },

    /// Failed to register/announce a service
    #[error("Failed to register service '{service_name}': {reason}")]
    RegisterFailed {
        service_name: String,
        reason: String,
    },

    /// Invalid service configuration
    #[error("Invalid service configuration: {0}")]
    InvalidConfig(String),

    /// Tearing down the daemon failed
    #[error("Failed to shut down mDNS daemon: {0}")]
    ShutdownFailed(String),
}
