//! # otcoap core
//!
//! Shared configuration, error and data types for the otcoap tools.
//!
//! - **Configuration**: [`AppConfig`] groups the settings of every tool (CoAP
//!   server, discovery, one-shot client, multicast subscription, sensor
//!   publisher and logging). It loads from YAML, with `OTCOAP__*` environment
//!   overrides through the `config` crate.
//! - **Errors**: [`ConfigError`] for configuration loading and validation.
//! - **Types**: [`ServiceAnnouncement`] produced by discovery and
//!   [`Measurement`] carried by sensor telemetry.
//!
//! ## Example
//!
//! ```
//! use otcoap_core::config::AppConfig;
//!
//! let config = AppConfig::from_yaml("discovery:\n  resolve_timeout_ms: 1500\n").unwrap();
//! assert_eq!(config.discovery.service_type, "_example._udp.local.");
//! assert!(config.validate().is_ok());
//! ```

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{AddressError, ConfigError, Result};
pub use types::{Measurement, ServiceAnnouncement};
