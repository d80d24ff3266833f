//! Interface selection and link-local scoping
//!
//! `mdns-sd` reports resolved addresses without the interface they were
//! heard on. Link-local IPv6 addresses are useless without one, so the
//! browser attaches a scope chosen here.

use crate::error::{DiscoveryError, Result};
use mdns_sd::{IfKind, ServiceDaemon};
use otcoap_core::config::DiscoveryConfig;
use std::net::IpAddr;
use tracing::{debug, warn};

/// Restricts `mdns` to the interfaces named by `config`.
///
/// Selections are applied in order, so IPv4 is dropped from the chosen
/// interface too when `ipv6_only` is set.
pub(crate) fn select_interfaces(mdns: &ServiceDaemon, config: &DiscoveryConfig) -> Result<()> {
    if let Some(name) = &config.interface {
        mdns.disable_interface(IfKind::All)
            .and_then(|_| mdns.enable_interface(IfKind::Name(name.clone())))
            .map_err(|e| {
                DiscoveryError::MdnsInitFailed(format!("Failed to select interface {}: {}", name, e))
            })?;
    }

    if config.ipv6_only {
        mdns.disable_interface(IfKind::IPv4).map_err(|e| {
            DiscoveryError::MdnsInitFailed(format!("Failed to disable IPv4 interfaces: {}", e))
        })?;
    }

    Ok(())
}

/// Interface index to attach to link-local peer addresses.
///
/// With an interface configured, that interface's index. Otherwise the
/// index of the only non-loopback interface carrying a link-local IPv6
/// address. `None` when there is no such interface or more than one.
pub(crate) fn link_scope(interface: Option<&str>) -> Option<u32> {
    let interfaces = match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces,
        Err(e) => {
            warn!(error = %e, "Failed to list network interfaces");
            return None;
        }
    };

    let scope = pick_scope(
        interfaces
            .iter()
            .map(|intf| (intf.name.as_str(), intf.ip(), intf.index, intf.is_loopback())),
        interface,
    );

    match scope {
        Some(index) => debug!(index, "Link-local scope selected"),
        None => warn!("No single interface for link-local peers, leaving them unscoped"),
    }

    scope
}

fn pick_scope<'a, I>(candidates: I, interface: Option<&str>) -> Option<u32>
where
    I: IntoIterator<Item = (&'a str, IpAddr, Option<u32>, bool)>,
{
    let mut candidates = candidates.into_iter();

    if let Some(wanted) = interface {
        return candidates.find_map(|(name, _, index, _)| if name == wanted { index } else { None });
    }

    let mut found: Option<u32> = None;
    for (_, ip, index, loopback) in candidates {
        let link_local = matches!(ip, IpAddr::V6(v6) if (v6.segments()[0] & 0xffc0) == 0xfe80);
        if loopback || !link_local {
            continue;
        }
        match (found, index) {
            (_, None) => continue,
            (None, Some(index)) => found = Some(index),
            (Some(current), Some(index)) if current == index => {}
            (Some(_), Some(_)) => return None,
        }
    }
    found
}
