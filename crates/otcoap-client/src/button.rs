//! Button press

use crate::error::Result;
use crate::exchange::{send_one_shot, ExchangeReport};
use crate::socket::open_for;
use otcoap_coap::{encode, RequestBuilder};
use otcoap_core::config::{ButtonConfig, ClientConfig};
use std::net::SocketAddr;
use tracing::{info, instrument};

/// Sends the configured request to a fixed target, like a push button
/// wired to a Thread node.
///
/// A unicast target gets a confirmable PUT and the press waits for the
/// response. A multicast target gets a non-confirmable PUT and nothing is
/// awaited, since multicast requests cannot be confirmable.
#[derive(Debug, Clone)]
pub struct Button {
    target: SocketAddr,
    client: ClientConfig,
}

impl Button {
    pub fn new(config: ButtonConfig, client: ClientConfig) -> Result<Self> {
        config.validate()?;
        client.validate()?;
        Ok(Self {
            target: config.target,
            client,
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Whether a press waits for a response.
    pub fn is_confirmable(&self) -> bool {
        !self.target.ip().is_multicast()
    }

    /// Sends one press. Returns the response for unicast targets.
    #[instrument(skip(self), fields(target = %self.target))]
    pub async fn press(&self) -> Result<Option<ExchangeReport>> {
        let payload = self.client.payload.as_bytes();

        if self.is_confirmable() {
            let report =
                send_one_shot(self.target, &self.client.path, payload, self.client.timeout())
                    .await?;
            return Ok(Some(report));
        }

        let request = RequestBuilder::put(&self.client.path)
            .non_confirmable()
            .payload(payload.to_vec())
            .build();

        let socket = open_for(self.target)?;
        socket.send_to(&encode(&request)?, self.target).await?;

        info!(path = %self.client.path, "Sent non-confirmable press");
        Ok(None)
    }
}
