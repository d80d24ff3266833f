//! Error types shared by the otcoap crates.

use thiserror::Error;

/// Result type alias using ConfigError as the error type.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Configuration source could not be read
    #[error("Failed to load configuration from {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    /// Configuration could not be deserialized
    #[error("Invalid configuration format: {reason}")]
    InvalidFormat { reason: String },

    /// A field holds a value that is out of range or malformed
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// A resolved service address that cannot be turned into a socket address.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid address '{value}': {reason}")]
pub struct AddressError {
    pub value: String,
    pub reason: String,
}

impl AddressError {
    pub fn new(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            reason: reason.into(),
        }
    }
}
