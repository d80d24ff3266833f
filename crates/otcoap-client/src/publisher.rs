//! Sensor telemetry publisher

use crate::error::Result;
use crate::socket::open_for;
use otcoap_coap::{encode, ContentFormat, RequestBuilder};
use otcoap_core::config::PublisherConfig;
use otcoap_core::Measurement;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, info};

/// Resource the measurements are sent to
pub const SENSOR_PATH: &str = "sensor";

/// Sends measurements as non-confirmable PUTs.
pub struct SensorPublisher {
    socket: UdpSocket,
    config: PublisherConfig,
}

impl SensorPublisher {
    /// Opens the publishing socket.
    pub fn new(config: PublisherConfig) -> Result<Self> {
        config.validate()?;

        let socket = open_for(config.target)?;
        debug!(target = %config.target, "Publisher socket ready");

        Ok(Self { socket, config })
    }

    pub fn target(&self) -> SocketAddr {
        self.config.target
    }

    /// Builds a measurement carrying the configured sensor id.
    pub fn measurement(&self, temperature: f64, pressure: f64, humidity: f64) -> Measurement {
        Measurement {
            id: self.config.id.clone(),
            temperature,
            pressure,
            humidity,
        }
    }

    /// Sends one measurement. No response is expected.
    pub async fn publish(&self, measurement: &Measurement) -> Result<()> {
        let request = RequestBuilder::put(SENSOR_PATH)
            .non_confirmable()
            .content_format(ContentFormat::ApplicationJSON)
            .payload(measurement.to_json().into_bytes())
            .build();

        self.socket
            .send_to(&encode(&request)?, self.config.target)
            .await?;

        info!(
            target = %self.config.target,
            sensor = %measurement.id,
            "Published measurement"
        );
        Ok(())
    }
}
