//! Configuration management for the otcoap tools.
//!
//! Every tool reads its settings from a single [`AppConfig`]. It can be
//! loaded from a YAML file, from a YAML string, or through the `config` crate
//! which layers `OTCOAP__<SECTION>__<FIELD>` environment variables over an
//! optional file. Command-line flags are applied on top by the binary.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::net::{Ipv6Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Default UDP port of CoAP (RFC 7252).
pub const COAP_DEFAULT_PORT: u16 = 5683;

/// Main application configuration.
///
/// # Examples
///
/// ```no_run
/// use otcoap_core::config::AppConfig;
///
/// let config = AppConfig::from_file("otcoap.yaml").unwrap();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// CoAP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// mDNS/DNS-SD discovery settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// One-shot CoAP client settings
    #[serde(default)]
    pub client: ClientConfig,

    /// IPv6 multicast subscription settings
    #[serde(default)]
    pub multicast: MulticastConfig,

    /// Sensor publisher settings
    #[serde(default)]
    pub publisher: PublisherConfig,

    /// Button press settings
    #[serde(default)]
    pub button: ButtonConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_yaml(&contents)
    }

    /// Loads configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::InvalidFormat {
            reason: e.to_string(),
        })
    }

    /// Loads configuration using the `config` crate: an optional YAML file
    /// followed by `OTCOAP__*` environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be loaded or the merged result
    /// does not deserialize.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let merged = builder
            .add_source(
                config::Environment::with_prefix("OTCOAP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::LoadFailed {
                path: path
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<environment>".to_string()),
                reason: e.to_string(),
            })?;

        merged
            .try_deserialize()
            .map_err(|e| ConfigError::InvalidFormat {
                reason: e.to_string(),
            })
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.discovery.validate()?;
        self.client.validate()?;
        self.multicast.validate()?;
        self.publisher.validate()?;
        self.button.validate()?;
        self.logging.parse_level()?;
        Ok(())
    }
}

/// CoAP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// UDP address the server binds to
    #[serde(default = "default_server_bind")]
    pub bind: SocketAddr,

    /// Also expose the `/led` resource
    #[serde(default)]
    pub enable_led: bool,
}

fn default_server_bind() -> SocketAddr {
    SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), COAP_DEFAULT_PORT)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_server_bind(),
            enable_led: false,
        }
    }
}

impl ServerConfig {
    /// Validates the server configuration.
    pub fn validate(&self) -> Result<()> {
        if self.bind.port() == 0 {
            return Err(ConfigError::invalid_value(
                "server.bind",
                "Port cannot be 0",
            ));
        }
        Ok(())
    }
}

/// Service discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Fully-qualified DNS-SD service type to browse
    #[serde(default = "default_service_type")]
    pub service_type: String,

    /// Bound on resolving a newly added instance (milliseconds)
    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout_ms: u64,

    /// Restrict mDNS to IPv6 interfaces
    #[serde(default = "default_true")]
    pub ipv6_only: bool,

    /// Instance name used when advertising
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Host name used when advertising (without `.local.`)
    #[serde(default = "default_host_name")]
    pub host_name: String,

    /// Network interface to run mDNS on, all interfaces when unset.
    /// Link-local peers are scoped to it.
    #[serde(default)]
    pub interface: Option<String>,
}

fn default_service_type() -> String {
    "_example._udp.local.".to_string()
}

fn default_resolve_timeout() -> u64 {
    3000
}

fn default_instance_name() -> String {
    "ot-service".to_string()
}

fn default_host_name() -> String {
    "ot-example".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            service_type: default_service_type(),
            resolve_timeout_ms: default_resolve_timeout(),
            ipv6_only: true,
            instance_name: default_instance_name(),
            host_name: default_host_name(),
            interface: None,
        }
    }
}

impl DiscoveryConfig {
    /// Returns the resolve timeout as a Duration.
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    /// Validates the discovery configuration.
    pub fn validate(&self) -> Result<()> {
        if self.service_type.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "discovery.service_type",
                "Service type cannot be empty",
            ));
        }

        if !self.service_type.ends_with(".local.") {
            return Err(ConfigError::invalid_value(
                "discovery.service_type",
                format!(
                    "'{}' must be fully qualified (end with .local.)",
                    self.service_type
                ),
            ));
        }

        if self.resolve_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "discovery.resolve_timeout_ms",
                "Timeout cannot be 0",
            ));
        }

        if self.instance_name.is_empty() || self.host_name.is_empty() {
            return Err(ConfigError::invalid_value(
                "discovery.instance_name",
                "Instance and host names cannot be empty",
            ));
        }

        if matches!(&self.interface, Some(name) if name.trim().is_empty()) {
            return Err(ConfigError::invalid_value(
                "discovery.interface",
                "Interface name cannot be empty",
            ));
        }

        Ok(())
    }
}

/// One-shot CoAP client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Resource path on the peer, without leading slash
    #[serde(default = "default_client_path")]
    pub path: String,

    /// Request payload
    #[serde(default = "default_client_payload")]
    pub payload: String,

    /// How long to wait for the response (milliseconds)
    #[serde(default = "default_client_timeout")]
    pub timeout_ms: u64,
}

fn default_client_path() -> String {
    "led".to_string()
}

fn default_client_payload() -> String {
    "2".to_string()
}

fn default_client_timeout() -> u64 {
    10_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            path: default_client_path(),
            payload: default_client_payload(),
            timeout_ms: default_client_timeout(),
        }
    }
}

impl ClientConfig {
    /// Returns the response timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validates the client configuration.
    pub fn validate(&self) -> Result<()> {
        if self.path.trim_matches('/').is_empty() {
            return Err(ConfigError::invalid_value(
                "client.path",
                "Path cannot be empty",
            ));
        }

        if self.timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "client.timeout_ms",
                "Timeout cannot be 0",
            ));
        }

        Ok(())
    }
}

/// IPv6 multicast subscription configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MulticastConfig {
    /// Group to join
    #[serde(default = "default_multicast_group")]
    pub group: Ipv6Addr,

    /// Interface index (0 lets the kernel choose)
    #[serde(default)]
    pub interface: u32,
}

fn default_multicast_group() -> Ipv6Addr {
    // ff03::1, realm-local all nodes
    Ipv6Addr::new(0xff03, 0, 0, 0, 0, 0, 0, 1)
}

impl Default for MulticastConfig {
    fn default() -> Self {
        Self {
            group: default_multicast_group(),
            interface: 0,
        }
    }
}

impl MulticastConfig {
    /// Creates a configuration for the given group on the default interface.
    pub fn new(group: Ipv6Addr) -> Self {
        Self {
            group,
            interface: 0,
        }
    }

    /// Validates the multicast configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.group.is_multicast() {
            return Err(ConfigError::invalid_value(
                "multicast.group",
                format!("{} is not an IPv6 multicast address", self.group),
            ));
        }
        Ok(())
    }
}

/// Sensor publisher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Where measurements are sent
    #[serde(default = "default_publisher_target")]
    pub target: SocketAddr,

    /// Sensor identifier placed in the `id` field
    #[serde(default = "default_publisher_id")]
    pub id: String,
}

fn default_publisher_target() -> SocketAddr {
    SocketAddr::new(default_multicast_group().into(), COAP_DEFAULT_PORT)
}

fn default_publisher_id() -> String {
    "otcoap-sensor".to_string()
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            target: default_publisher_target(),
            id: default_publisher_id(),
        }
    }
}

impl PublisherConfig {
    /// Validates the publisher configuration.
    pub fn validate(&self) -> Result<()> {
        if self.target.port() == 0 {
            return Err(ConfigError::invalid_value(
                "publisher.target",
                "Port cannot be 0",
            ));
        }
        if self.id.is_empty() {
            return Err(ConfigError::invalid_value(
                "publisher.id",
                "Sensor id cannot be empty",
            ));
        }
        Ok(())
    }
}

/// Button press configuration.
///
/// A press sends the `client` path and payload to `target`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ButtonConfig {
    /// Peer or multicast group the press goes to
    #[serde(default = "default_publisher_target")]
    pub target: SocketAddr,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            target: default_publisher_target(),
        }
    }
}

impl ButtonConfig {
    pub fn validate(&self) -> Result<()> {
        if self.target.port() == 0 {
            return Err(ConfigError::invalid_value(
                "button.target",
                "Port cannot be 0",
            ));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingConfig {
    /// Parses the log level string to a tracing Level.
    pub fn parse_level(&self) -> Result<Level> {
        self.level.parse().map_err(|_| {
            ConfigError::invalid_value("logging.level", format!("Invalid log level: {}", self.level))
        })
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON format for structured logging
    Json,
}
