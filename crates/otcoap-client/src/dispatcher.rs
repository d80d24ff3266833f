//! Request dispatch to discovered services

use crate::error::Result;
use crate::exchange::{send_one_shot, ExchangeReport};
use otcoap_core::config::ClientConfig;
use otcoap_core::ServiceAnnouncement;
use tracing::{debug, instrument};

/// Sends the configured request to each service it is given.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: ClientConfig,
}

impl Dispatcher {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Performs one exchange with the announced service.
    #[instrument(skip(self, service), fields(service = %service.name))]
    pub async fn dispatch(&self, service: &ServiceAnnouncement) -> Result<ExchangeReport> {
        let target = service.socket_addr()?;
        debug!(target = %target, path = %self.config.path, "Dispatching request");

        send_one_shot(
            target,
            &self.config.path,
            self.config.payload.as_bytes(),
            self.config.timeout(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use otcoap_coap::{decode, encode, response_to, ResponseType};
    use std::time::Duration;
    use tokio::net::UdpSocket;

    fn announcement(address: &str, port: u16) -> ServiceAnnouncement {
        ServiceAnnouncement::new(
            "ot-service._example._udp.local.",
            "_example._udp.local.",
            "ot-example.local.",
            address,
            port,
        )
    }

    #[tokio::test]
    async fn test_dispatch_uses_configured_request() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = peer.local_addr().unwrap().port();

        let responder = tokio::spawn(async move {
            let mut buffer = [0u8; 1500];
            let (size, client) = peer.recv_from(&mut buffer).await.unwrap();
            let request = decode(&buffer[..size]).unwrap();
            let response = response_to(&request, ResponseType::Changed, b"0".to_vec()).unwrap();
            peer.send_to(&encode(&response).unwrap(), client).await.unwrap();
            request
        });

        let dispatcher = Dispatcher::new(ClientConfig {
            path: "led".to_string(),
            payload: "1".to_string(),
            timeout_ms: 2000,
        });
        let report = dispatcher
            .dispatch(&announcement("127.0.0.1", port))
            .await
            .unwrap();

        let request = responder.await.unwrap();
        assert_eq!(request.payload, b"1");
        assert_eq!(otcoap_coap::uri_path(&request), "led");
        assert_eq!(report.code_string(), "2.04");
    }

    #[tokio::test]
    async fn test_dispatch_rejects_bad_address() {
        let dispatcher = Dispatcher::new(ClientConfig::default());
        let err = dispatcher
            .dispatch(&announcement("fe80::1%eth0", 5683))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Address(_)));
    }

    #[tokio::test]
    async fn test_dispatch_timeout() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = silent.local_addr().unwrap().port();

        let dispatcher = Dispatcher::new(ClientConfig {
            timeout_ms: 150,
            ..ClientConfig::default()
        });
        let started = tokio::time::Instant::now();
        let err = dispatcher
            .dispatch(&announcement("127.0.0.1", port))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(started.elapsed() >= Duration::from_millis(150));
    }
}
