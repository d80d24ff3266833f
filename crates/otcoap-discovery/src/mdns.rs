//! mDNS browsing backend

use crate::error::{DiscoveryError, Result};
use crate::listener::Resolve;
use crate::types::BrowseEvent;
use async_channel::Receiver;
use async_trait::async_trait;
use dashmap::DashMap;
use crate::scope::{link_scope, select_interfaces};
use mdns_sd::{ServiceDaemon, ServiceEvent as MdnsEvent, ServiceInfo};
use otcoap_core::config::DiscoveryConfig;
use otcoap_core::ServiceAnnouncement;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv6Addr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Maximum number of events to buffer in the channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Resolved instances keyed by full service name
type ResolutionCache = DashMap<String, ServiceAnnouncement>;

/// Browses one service type on the local mDNS bus.
///
/// Found instances are reported as `Added`, repeated resolutions as
/// `Updated` and withdrawals as `Removed`. Resolved records are kept in a
/// cache that [`MdnsResolver`] reads.
pub struct MdnsBrowser {
    mdns: ServiceDaemon,
    service_type: String,
    resolved: Arc<ResolutionCache>,
    notify: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl MdnsBrowser {
    /// Starts browsing and returns the browser with its event stream.
    pub fn start(config: &DiscoveryConfig) -> Result<(Self, Receiver<BrowseEvent>)> {
        config
            .validate()
            .map_err(|e| DiscoveryError::InvalidConfig(e.to_string()))?;

        let mdns = ServiceDaemon::new().map_err(|e| {
            DiscoveryError::MdnsInitFailed(format!("Failed to create mDNS daemon: {}", e))
        })?;

        select_interfaces(&mdns, config)?;

        let receiver = mdns
            .browse(&config.service_type)
            .map_err(|e| DiscoveryError::BrowseFailed {
                service_type: config.service_type.clone(),
                reason: e.to_string(),
            })?;

        info!(
            service_type = %config.service_type,
            ipv6_only = config.ipv6_only,
            interface = config.interface.as_deref().unwrap_or("all"),
            "Started browsing"
        );

        let (event_tx, event_rx) = async_channel::bounded(EVENT_CHANNEL_CAPACITY);
        let resolved = Arc::new(ResolutionCache::new());
        let notify = Arc::new(Notify::new());

        let mut translator = EventTranslator::new(
            Arc::clone(&resolved),
            Arc::clone(&notify),
            link_scope(config.interface.as_deref()),
        );
        let service_type = config.service_type.clone();

        let task = tokio::spawn(async move {
            while let Ok(event) = receiver.recv_async().await {
                let Some(event) = translator.translate(event) else {
                    continue;
                };
                if event_tx.send(event).await.is_err() {
                    debug!("Event receiver dropped");
                    break;
                }
            }
            debug!(service_type = %service_type, "Browser task stopped");
        });

        Ok((
            Self {
                mdns,
                service_type: config.service_type.clone(),
                resolved,
                notify,
                task: Some(task),
            },
            event_rx,
        ))
    }

    /// Returns a resolver backed by this browser's cache.
    pub fn resolver(&self) -> Arc<MdnsResolver> {
        Arc::new(MdnsResolver {
            resolved: Arc::clone(&self.resolved),
            notify: Arc::clone(&self.notify),
        })
    }

    /// Stops browsing and shuts the daemon down.
    pub fn shutdown(mut self) -> Result<()> {
        info!(service_type = %self.service_type, "Stopping discovery");

        if let Some(task) = self.task.take() {
            task.abort();
        }

        if let Err(e) = self.mdns.stop_browse(&self.service_type) {
            warn!(error = %e, "Failed to stop browse");
        }

        self.mdns
            .shutdown()
            .map_err(|e| DiscoveryError::ShutdownFailed(e.to_string()))?;

        Ok(())
    }
}

impl Drop for MdnsBrowser {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            warn!("Browser dropped while still running");
            task.abort();
            let _ = self.mdns.shutdown();
        }
    }
}

/// Reads resolutions made by an [`MdnsBrowser`].
pub struct MdnsResolver {
    resolved: Arc<ResolutionCache>,
    notify: Arc<Notify>,
}

#[async_trait]
impl Resolve for MdnsResolver {
    async fn resolve(
        &self,
        _service_type: &str,
        name: &str,
        timeout: Duration,
    ) -> Option<ServiceAnnouncement> {
        wait_for(&self.resolved, &self.notify, name, timeout).await
    }
}

async fn wait_for(
    resolved: &ResolutionCache,
    notify: &Notify,
    name: &str,
    timeout: Duration,
) -> Option<ServiceAnnouncement> {
    let lookup = async {
        loop {
            // registered before the lookup so an insert in between still wakes us
            let notified = notify.notified();
            let cached = resolved.get(name).map(|entry| entry.value().clone());
            if let Some(service) = cached {
                return service;
            }
            notified.await;
        }
    };

    tokio::time::timeout(timeout, lookup).await.ok()
}

/// Turns raw mDNS events into browse notifications.
struct EventTranslator {
    seen: HashSet<String>,
    resolved: Arc<ResolutionCache>,
    notify: Arc<Notify>,
    /// Interface index appended to link-local addresses
    link_scope: Option<u32>,
}

impl EventTranslator {
    fn new(resolved: Arc<ResolutionCache>, notify: Arc<Notify>, link_scope: Option<u32>) -> Self {
        Self {
            seen: HashSet::new(),
            resolved,
            notify,
            link_scope,
        }
    }

    fn translate(&mut self, event: MdnsEvent) -> Option<BrowseEvent> {
        match event {
            MdnsEvent::ServiceFound(service_type, fullname) => {
                debug!(service = %fullname, "Service found");
                if self.seen.insert(fullname.clone()) {
                    Some(BrowseEvent::added(service_type, fullname))
                } else {
                    None
                }
            }

            MdnsEvent::ServiceResolved(info) => {
                debug!(
                    service = info.get_fullname(),
                    hostname = info.get_hostname(),
                    port = info.get_port(),
                    "Service resolved"
                );

                let Some(service) = convert_service_info(&info, self.link_scope) else {
                    warn!(service = info.get_fullname(), "Resolved service has no address");
                    return None;
                };

                let fullname = service.name.clone();
                let service_type = service.service_type.clone();
                let previous = self.resolved.insert(fullname.clone(), service);
                self.notify.notify_waiters();

                if self.seen.insert(fullname.clone()) {
                    Some(BrowseEvent::added(service_type, fullname))
                } else if previous.is_some() {
                    Some(BrowseEvent::updated(service_type, fullname))
                } else {
                    None
                }
            }

            MdnsEvent::ServiceRemoved(service_type, fullname) => {
                debug!(service = %fullname, "Service removed");
                self.resolved.remove(&fullname);
                if self.seen.remove(&fullname) {
                    Some(BrowseEvent::removed(service_type, fullname))
                } else {
                    None
                }
            }

            MdnsEvent::SearchStarted(service_type) => {
                debug!(service_type = %service_type, "Search started");
                None
            }

            MdnsEvent::SearchStopped(service_type) => {
                debug!(service_type = %service_type, "Search stopped");
                None
            }

            #[allow(unreachable_patterns)]
            other => {
                error!(event = ?other, "Unexpected mDNS event");
                None
            }
        }
    }
}

/// Converts ServiceInfo from mdns-sd to a ServiceAnnouncement
fn convert_service_info(info: &ServiceInfo, link_scope: Option<u32>) -> Option<ServiceAnnouncement> {
    let address = ServiceAnnouncement::preferred_address(info.get_addresses())?;

    let address = match (address, link_scope) {
        (IpAddr::V6(v6), Some(scope)) if is_link_local(&v6) => format!("{}%{}", v6, scope),
        (IpAddr::V6(v6), None) if is_link_local(&v6) => {
            warn!(
                service = info.get_fullname(),
                address = %v6,
                "Link-local address without a scope"
            );
            v6.to_string()
        }
        (address, _) => address.to_string(),
    };

    Some(ServiceAnnouncement::new(
        info.get_fullname(),
        info.get_type(),
        info.get_hostname(),
        address,
        info.get_port(),
    ))
}

fn is_link_local(address: &Ipv6Addr) -> bool {
    (address.segments()[0] & 0xffc0) == 0xfe80
}
