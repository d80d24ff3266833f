//! Service announcement

use crate::error::{DiscoveryError, Result};
use crate::scope::select_interfaces;
use mdns_sd::{ServiceDaemon, ServiceInfo};
use otcoap_core::config::DiscoveryConfig;
use std::collections::HashMap;
use tracing::{info, warn};

/// Announces one service instance on the local mDNS bus.
///
/// The instance stays registered until [`Advertiser::shutdown`] is called
/// or the advertiser is dropped.
pub struct Advertiser {
    mdns: ServiceDaemon,
    fullname: Option<String>,
}

impl Advertiser {
    /// Registers `instance_name` on `{host_name}.local.` at `port`.
    ///
    /// Addresses are taken from the enabled interfaces and follow them as
    /// they change.
    pub fn register(config: &DiscoveryConfig, port: u16) -> Result<Self> {
        config
            .validate()
            .map_err(|e| DiscoveryError::InvalidConfig(e.to_string()))?;

        let mdns = ServiceDaemon::new().map_err(|e| {
            DiscoveryError::MdnsInitFailed(format!("Failed to create mDNS daemon: {}", e))
        })?;

        select_interfaces(&mdns, config)?;

        let host = host_fqdn(&config.host_name);

        info!(
            instance = %config.instance_name,
            host = %host,
            port,
            "Starting service announcement"
        );

        let mut properties = HashMap::new();
        properties.insert("version".to_string(), env!("CARGO_PKG_VERSION").to_string());

        let service_info = ServiceInfo::new(
            &config.service_type,
            &config.instance_name,
            &host,
            "",
            port,
            properties,
        )
        .map_err(|e| DiscoveryError::RegisterFailed {
            service_name: config.instance_name.clone(),
            reason: e.to_string(),
        })?
        .enable_addr_auto();

        let fullname = service_info.get_fullname().to_string();

        mdns.register(service_info)
            .map_err(|e| DiscoveryError::RegisterFailed {
                service_name: config.instance_name.clone(),
                reason: e.to_string(),
            })?;

        info!(service = %fullname, "Service announcement registered");

        Ok(Self {
            mdns,
            fullname: Some(fullname),
        })
    }

    /// Full name of the registered instance
    pub fn fullname(&self) -> Option<&str> {
        self.fullname.as_deref()
    }

    /// Withdraws the instance and shuts the daemon down.
    pub fn shutdown(mut self) -> Result<()> {
        self.unregister();
        self.mdns
            .shutdown()
            .map_err(|e| DiscoveryError::ShutdownFailed(e.to_string()))?;
        Ok(())
    }

    fn unregister(&mut self) {
        if let Some(fullname) = self.fullname.take() {
            info!(service = %fullname, "Withdrawing service announcement");
            if let Err(e) = self.mdns.unregister(&fullname) {
                warn!(service = %fullname, error = %e, "Failed to unregister service");
            }
        }
    }
}

impl Drop for Advertiser {
    fn drop(&mut self) {
        if self.fullname.is_some() {
            self.unregister();
            let _ = self.mdns.shutdown();
        }
    }
}

/// Qualifies a bare host name with the `.local.` domain.
fn host_fqdn(host_name: &str) -> String {
    let host = host_name.trim_end_matches('.');
    if host.ends_with(".local") {
        format!("{host}.")
    } else {
        format!("{host}.local.")
    }
}
