//! `/sensor` telemetry ingest

use crate::resource::{Reply, Resource};
use otcoap_coap::Packet;
use otcoap_core::Measurement;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

/// Why a telemetry payload was not ingested
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Empty payload")]
    EmptyPayload,

    #[error("Malformed measurement: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Receives sensor measurements sent as JSON in a PUT body.
///
/// Every PUT is answered with an empty `2.04 Changed` (suppressed for
/// non-confirmable requests), whether or not the body parsed. A bad body
/// is logged and counted and never stops the server.
#[derive(Debug, Default)]
pub struct SensorResource {
    subscriber: Option<UnboundedSender<Measurement>>,
    ingested: AtomicU64,
    rejected: AtomicU64,
}

impl SensorResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also forwards each accepted measurement to `subscriber`.
    pub fn with_subscriber(subscriber: UnboundedSender<Measurement>) -> Self {
        Self {
            subscriber: Some(subscriber),
            ..Self::default()
        }
    }

    /// Parses a telemetry payload.
    pub fn ingest(payload: &[u8]) -> Result<Measurement, IngestError> {
        if payload.is_empty() {
            return Err(IngestError::EmptyPayload);
        }
        Ok(Measurement::from_json(payload)?)
    }

    pub fn ingested(&self) -> u64 {
        self.ingested.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

impl Resource for SensorResource {
    fn put(&self, request: &Packet) -> Reply {
        match Self::ingest(&request.payload) {
            Ok(measurement) => {
                self.ingested.fetch_add(1, Ordering::Relaxed);
                info!(
                    id = %measurement.id,
                    temperature = measurement.temperature,
                    pressure = measurement.pressure,
                    humidity = measurement.humidity,
                    "Received measurement"
                );
                println!("{measurement}");

                if let Some(subscriber) = &self.subscriber {
                    let _ = subscriber.send(measurement);
                }
            }
            Err(e) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(
                    error = %e,
                    size = request.payload.len(),
                    "Dropping sensor payload"
                );
            }
        }

        Reply::changed().no_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otcoap_coap::{MessageClass, RequestBuilder, ResponseType};
    use tokio::sync::mpsc;

    fn put(payload: &[u8]) -> Packet {
        RequestBuilder::put("sensor").payload(payload.to_vec()).build()
    }

    #[test]
    fn test_valid_measurement_is_acknowledged() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let resource = SensorResource::with_subscriber(tx);

        let reply = resource.put(&put(
            br#"{"id":"f4ce36","temp":22.31,"press":1008.12,"hum":51.02}"#,
        ));

        assert_eq!(reply.status, ResponseType::Changed);
        assert!(reply.payload.is_empty());
        assert_eq!(resource.ingested(), 1);
        assert_eq!(resource.rejected(), 0);

        let measurement = rx.try_recv().unwrap();
        assert_eq!(measurement.id, "f4ce36");
        assert_eq!(measurement.pressure, 1008.12);
    }

    #[test]
    fn test_bad_payloads_are_still_acknowledged() {
        let resource = SensorResource::new();

        let payloads: [&[u8]; 4] = [
            b"",
            b"{not json",
            br#"{"id":"x","temp":1.0,"press":2.0}"#,
            br#"{"id":"x","temp":"warm","press":2.0,"hum":3.0}"#,
        ];
        for payload in payloads {
            let reply = resource.put(&put(payload));
            assert_eq!(reply.status, ResponseType::Changed);
            assert!(reply.payload.is_empty());
        }

        assert_eq!(resource.ingested(), 0);
        assert_eq!(resource.rejected(), 4);
    }

    #[test]
    fn test_ingest_errors() {
        assert!(matches!(
            SensorResource::ingest(b""),
            Err(IngestError::EmptyPayload)
        ));
        assert!(matches!(
            SensorResource::ingest(br#"{"id":"x"}"#),
            Err(IngestError::Malformed(_))
        ));
    }

    #[test]
    fn test_get_not_allowed() {
        let resource = SensorResource::new();
        let reply = resource.get(&RequestBuilder::get("sensor").build());
        assert_eq!(reply.status, ResponseType::MethodNotAllowed);
    }

    #[test]
    fn test_routed_confirmable_put_gets_empty_ack() {
        let router = crate::Router::new().resource("sensor", SensorResource::new());
        let request = put(br#"{"id":"a","temp":1,"press":2,"hum":3}"#);
        let ack = router.handle(&request).unwrap();
        assert_eq!(ack.header.code, MessageClass::Response(ResponseType::Changed));
        assert!(ack.payload.is_empty());

        let non = RequestBuilder::put("sensor")
            .non_confirmable()
            .payload(br#"{"id":"a","temp":1,"press":2,"hum":3}"#.to_vec())
            .build();
        assert!(router.handle(&non).is_none());
    }
}
