//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use otcoap::discovery::Resolve;
use otcoap_core::ServiceAnnouncement;
use otcoap_server::{CoapServer, LedResource, Router};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const SERVICE_TYPE: &str = "_example._udp.local.";

/// Resolves a fixed set of instance names.
#[derive(Default)]
pub struct StaticResolver {
    entries: HashMap<String, ServiceAnnouncement>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, addr: SocketAddr) -> Self {
        self.entries.insert(
            name.to_string(),
            ServiceAnnouncement::new(
                name,
                SERVICE_TYPE,
                "ot-example.local.",
                addr.ip().to_string(),
                addr.port(),
            ),
        );
        self
    }
}

#[async_trait]
impl Resolve for StaticResolver {
    async fn resolve(
        &self,
        _service_type: &str,
        name: &str,
        _timeout: Duration,
    ) -> Option<ServiceAnnouncement> {
        self.entries.get(name).cloned()
    }
}

/// A CoAP peer exposing `/led` on loopback.
pub struct LedPeer {
    pub addr: SocketAddr,
    cancel: CancellationToken,
    handle: JoinHandle<otcoap_server::Result<()>>,
}

impl LedPeer {
    pub async fn start() -> Self {
        let server = CoapServer::bind("127.0.0.1:0".parse().unwrap())
            .await
            .expect("Failed to bind LED peer");
        let addr = server.local_addr();
        let cancel = CancellationToken::new();
        let handle = server.spawn(
            Router::new().resource("led", LedResource::new()),
            cancel.clone(),
        );
        Self {
            addr,
            cancel,
            handle,
        }
    }

    pub async fn stop(self) {
        self.cancel.cancel();
        self.handle
            .await
            .expect("LED peer panicked")
            .expect("LED peer failed");
    }
}
