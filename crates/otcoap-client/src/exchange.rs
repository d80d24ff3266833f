//! One-shot confirmable request

use crate::error::{ClientError, Result};
use otcoap_coap::{
    decode, empty_ack, encode, format_code, is_request, MessageClass, MessageType, Packet,
    RequestBuilder,
};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

/// Largest datagram the client reads.
const MAX_DATAGRAM_SIZE: usize = 1500;

/// Outcome of a completed exchange
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeReport {
    /// Response code
    pub code: MessageClass,
    /// Response payload
    pub payload: Vec<u8>,
}

impl ExchangeReport {
    fn from_response(packet: Packet) -> Self {
        Self {
            code: packet.header.code,
            payload: packet.payload,
        }
    }

    /// Code in `c.dd` form
    pub fn code_string(&self) -> String {
        format_code(self.code)
    }

    /// Lines printed after a successful exchange.
    pub fn lines(&self) -> [String; 2] {
        [
            format!("Response code: {}", self.code_string()),
            format!(
                "Response payload: {}",
                String::from_utf8_lossy(&self.payload)
            ),
        ]
    }
}

/// Sends one confirmable PUT to `target` and waits for its response.
///
/// The response is matched on the message id when piggybacked on the ACK,
/// or on the token when sent separately. A confirmable separate response is
/// acknowledged. The request is sent once and never retransmitted.
pub async fn send_one_shot(
    target: SocketAddr,
    path: &str,
    payload: &[u8],
    timeout: Duration,
) -> Result<ExchangeReport> {
    let socket = UdpSocket::bind(unspecified_for(&target)).await?;

    let request = RequestBuilder::put(path).payload(payload.to_vec()).build();
    let message_id = request.header.message_id;
    let token = request.get_token().to_vec();

    socket.send_to(&encode(&request)?, target).await?;
    debug!(
        target = %target,
        path,
        message_id,
        "Sent confirmable PUT"
    );

    let response = tokio::time::timeout(
        timeout,
        await_response(&socket, target, message_id, &token),
    )
    .await
    .map_err(|_| ClientError::Timeout {
        target,
        timeout_ms: timeout.as_millis() as u64,
    })??;

    info!(
        target = %target,
        path,
        code = %response.code_string(),
        "Exchange complete"
    );

    Ok(response)
}

fn unspecified_for(target: &SocketAddr) -> SocketAddr {
    match target {
        SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
        SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
    }
}

async fn await_response(
    socket: &UdpSocket,
    target: SocketAddr,
    message_id: u16,
    token: &[u8],
) -> Result<ExchangeReport> {
    let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

    loop {
        let (size, peer) = socket.recv_from(&mut buffer).await?;

        let packet = match decode(&buffer[..size]) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(peer = %peer, error = %e, "Dropping undecodable datagram");
                continue;
            }
        };

        match packet.header.get_type() {
            MessageType::Reset if packet.header.message_id == message_id => {
                return Err(ClientError::Reset(target));
            }
            MessageType::Acknowledgement if packet.header.message_id == message_id => {
                if packet.header.code == MessageClass::Empty {
                    debug!(peer = %peer, "Empty ACK, waiting for separate response");
                    continue;
                }
                return Ok(ExchangeReport::from_response(packet));
            }
            MessageType::Confirmable | MessageType::NonConfirmable
                if packet.get_token() == token && !is_request(&packet) =>
            {
                if packet.header.get_type() == MessageType::Confirmable {
                    let ack = encode(&empty_ack(&packet))?;
                    if let Err(e) = socket.send_to(&ack, peer).await {
                        warn!(peer = %peer, error = %e, "Failed to acknowledge separate response");
                    }
                }
                return Ok(ExchangeReport::from_response(packet));
            }
            _ => {
                debug!(
                    peer = %peer,
                    message_id = packet.header.message_id,
                    "Ignoring unrelated message"
                );
            }
        }
    }
}
