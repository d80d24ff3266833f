//! Browse notifications

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a service instance changed on the discovery bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStateChange {
    /// New instance observed
    Added,

    /// Known instance re-announced with new records
    Updated,

    /// Instance withdrawn or expired
    Removed,
}

impl fmt::Display for ServiceStateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceStateChange::Added => "Added",
            ServiceStateChange::Updated => "Updated",
            ServiceStateChange::Removed => "Removed",
        };
        f.write_str(name)
    }
}

/// A state-change notification for one service instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseEvent {
    pub change: ServiceStateChange,

    /// Service type (e.g., "_example._udp.local.")
    pub service_type: String,

    /// Full instance name
    pub name: String,
}

impl BrowseEvent {
    pub fn new(
        change: ServiceStateChange,
        service_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            change,
            service_type: service_type.into(),
            name: name.into(),
        }
    }

    pub fn added(service_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ServiceStateChange::Added, service_type, name)
    }

    pub fn updated(service_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ServiceStateChange::Updated, service_type, name)
    }

    pub fn removed(service_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ServiceStateChange::Removed, service_type, name)
    }
}

impl fmt::Display for BrowseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Service {} of type {} state changed: {}",
            self.name, self.service_type, self.change
        )
    }
}

/// What a browse session saw
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseSummary {
    pub added: u64,
    pub updated: u64,
    pub removed: u64,

    /// Added instances that resolved and were handed to the callback
    pub resolved: u64,

    /// Added instances whose resolution came back empty
    pub unresolved: u64,
}
