//! UDP receive loop

use crate::error::{Result, ServerError};
use crate::resource::Router;
use otcoap_coap::{decode, encode};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Largest datagram the server reads.
const MAX_DATAGRAM_SIZE: usize = 1500;

/// Server statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Datagrams received
    pub datagrams_received: u64,
    /// Datagrams that did not decode as CoAP
    pub decode_errors: u64,
    /// Responses sent
    pub responses_sent: u64,
}

#[derive(Debug, Default)]
struct ServerState {
    received: AtomicU64,
    decode_errors: AtomicU64,
    sent: AtomicU64,
}

impl ServerState {
    fn stats(&self) -> ServerStats {
        ServerStats {
            datagrams_received: self.received.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            responses_sent: self.sent.load(Ordering::Relaxed),
        }
    }
}

/// CoAP server bound to one UDP socket
pub struct CoapServer {
    socket: UdpSocket,
    local_addr: SocketAddr,
    state: Arc<ServerState>,
}

impl CoapServer {
    /// Binds the server socket.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| ServerError::BindFailed { addr, source })?;
        let local_addr = socket.local_addr()?;

        info!(bind_addr = %local_addr, "CoAP server bound");

        Ok(Self {
            socket,
            local_addr,
            state: Arc::new(ServerState::default()),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns a handle that reads the statistics while the server runs.
    pub fn stats_handle(&self) -> impl Fn() -> ServerStats + Send + Sync + 'static {
        let state = Arc::clone(&self.state);
        move || state.stats()
    }

    /// Serves requests until `cancel` fires.
    ///
    /// Undecodable datagrams and send failures are logged and skipped.
    pub async fn run(self, router: Router, cancel: CancellationToken) -> Result<()> {
        info!(
            bind_addr = %self.local_addr,
            resources = ?router.paths(),
            "CoAP server started"
        );

        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            let (size, peer) = tokio::select! {
                _ = cancel.cancelled() => {
                    info!(bind_addr = %self.local_addr, "CoAP server stopping");
                    break;
                }
                result = self.socket.recv_from(&mut buffer) => match result {
                    Ok(received) => received,
                    Err(e) => {
                        // ICMP port unreachable from an earlier send shows up here on some platforms
                        warn!(error = %e, "Receive error");
                        continue;
                    }
                },
            };

            self.state.received.fetch_add(1, Ordering::Relaxed);

            let packet = match decode(&buffer[..size]) {
                Ok(packet) => packet,
                Err(e) => {
                    self.state.decode_errors.fetch_add(1, Ordering::Relaxed);
                    warn!(peer = %peer, size, error = %e, "Dropping datagram");
                    continue;
                }
            };

            debug!(
                peer = %peer,
                message_id = packet.header.message_id,
                "Received message"
            );

            let Some(response) = router.handle(&packet) else {
                continue;
            };

            let bytes = match encode(&response) {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!(peer = %peer, error = %e, "Failed to encode response");
                    continue;
                }
            };

            match self.socket.send_to(&bytes, peer).await {
                Ok(_) => {
                    self.state.sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => warn!(peer = %peer, error = %e, "Failed to send response"),
            }
        }

        Ok(())
    }

    /// Runs the server on a background task.
    pub fn spawn(self, router: Router, cancel: CancellationToken) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run(router, cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LedResource, SensorResource};
    use otcoap_coap::{MessageClass, MessageType, RequestBuilder, ResponseType};
    use std::time::Duration;
    use tokio::time::timeout;

    async fn start() -> (SocketAddr, CancellationToken, JoinHandle<Result<()>>) {
        let router = Router::new()
            .resource("sensor", SensorResource::new())
            .resource("led", LedResource::new());
        let server = CoapServer::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = server.local_addr();
        let cancel = CancellationToken::new();
        let handle = server.spawn(router, cancel.clone());
        (addr, cancel, handle)
    }

    async fn exchange(server: SocketAddr, datagram: &[u8]) -> Option<Vec<u8>> {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket.send_to(datagram, server).await.unwrap();
        let mut buffer = [0u8; MAX_DATAGRAM_SIZE];
        match timeout(Duration::from_millis(500), socket.recv_from(&mut buffer)).await {
            Ok(Ok((size, _))) => Some(buffer[..size].to_vec()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_led_over_udp() {
        let (addr, cancel, handle) = start().await;

        let request = RequestBuilder::put("led").payload(b"2".to_vec()).build();
        let reply = exchange(addr, &encode(&request).unwrap()).await.unwrap();
        let response = decode(&reply).unwrap();

        assert_eq!(response.header.get_type(), MessageType::Acknowledgement);
        assert_eq!(response.header.message_id, request.header.message_id);
        assert_eq!(response.header.code, MessageClass::Response(ResponseType::Changed));
        assert_eq!(response.payload, b"1");

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_survives_garbage_and_bad_telemetry() {
        let (addr, cancel, handle) = start().await;

        assert!(exchange(addr, &[0xde, 0xad]).await.is_none());

        let bad = RequestBuilder::put("sensor").payload(b"{oops".to_vec()).build();
        let reply = exchange(addr, &encode(&bad).unwrap()).await.unwrap();
        let ack = decode(&reply).unwrap();
        assert_eq!(ack.header.code, MessageClass::Response(ResponseType::Changed));
        assert!(ack.payload.is_empty());

        let request = RequestBuilder::get("led").build();
        let reply = exchange(addr, &encode(&request).unwrap()).await.unwrap();
        assert_eq!(decode(&reply).unwrap().payload, b"0");

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_stats() {
        let router = Router::new().resource("led", LedResource::new());
        let server = CoapServer::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = server.local_addr();
        let stats = server.stats_handle();
        let cancel = CancellationToken::new();
        let handle = server.spawn(router, cancel.clone());

        exchange(addr, &[0x00]).await;
        let request = RequestBuilder::get("led").build();
        exchange(addr, &encode(&request).unwrap()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let snapshot = stats();
        assert_eq!(snapshot.datagrams_received, 2);
        assert_eq!(snapshot.decode_errors, 1);
        assert_eq!(snapshot.responses_sent, 1);

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_bind_conflict() {
        let first = CoapServer::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let result = CoapServer::bind(first.local_addr()).await;
        assert!(matches!(result, Err(ServerError::BindFailed { .. })));
    }
}
