//! `/led` resource

use crate::resource::{Reply, Resource};
use otcoap_coap::{Packet, ResponseType};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};

/// A software LED.
///
/// PUT `0` switches it off, `1` on and `2` toggles it. Only the first payload
/// byte is read. PUT answers `2.04 Changed` and GET answers `2.05 Content`,
/// both carrying the state as `0` or `1`. A non-confirmable PUT still
/// switches the LED but gets no response.
#[derive(Debug, Default)]
pub struct LedResource {
    on: AtomicBool,
}

impl LedResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }

    fn state_payload(&self) -> Vec<u8> {
        vec![if self.is_on() { b'1' } else { b'0' }]
    }
}

impl Resource for LedResource {
    fn get(&self, _request: &Packet) -> Reply {
        Reply::content(self.state_payload())
    }

    fn put(&self, request: &Packet) -> Reply {
        match request.payload.first() {
            Some(b'0') => self.on.store(false, Ordering::SeqCst),
            Some(b'1') => self.on.store(true, Ordering::SeqCst),
            Some(b'2') => {
                self.on.fetch_xor(true, Ordering::SeqCst);
            }
            Some(other) => error!(payload = %char::from(*other), "Received unsupported payload"),
            None => error!("Received empty payload"),
        }

        let state = self.state_payload();
        info!(state = %char::from(state[0]), "LED state");
        Reply::new(ResponseType::Changed)
            .with_payload(state)
            .no_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Router;
    use otcoap_coap::{MessageClass, MessageType, RequestBuilder};

    fn put(led: &LedResource, payload: &[u8]) -> Reply {
        led.put(&RequestBuilder::put("led").payload(payload.to_vec()).build())
    }

    #[test]
    fn test_set_and_toggle() {
        let led = LedResource::new();
        assert!(!led.is_on());

        let reply = put(&led, b"2");
        assert_eq!(reply.status, ResponseType::Changed);
        assert_eq!(reply.payload, b"1");
        assert!(led.is_on());

        assert_eq!(put(&led, b"2").payload, b"0");
        assert_eq!(put(&led, b"1").payload, b"1");
        assert_eq!(put(&led, b"1").payload, b"1");
        assert_eq!(put(&led, b"0").payload, b"0");
    }

    #[test]
    fn test_unsupported_payload_keeps_state() {
        let led = LedResource::new();
        put(&led, b"1");

        let reply = put(&led, b"x");
        assert_eq!(reply.status, ResponseType::Changed);
        assert_eq!(reply.payload, b"1");

        let reply = put(&led, b"");
        assert_eq!(reply.payload, b"1");
    }

    #[test]
    fn test_non_confirmable_put_is_silent() {
        let router = Router::new().resource("led", LedResource::new());
        let state = |router: &Router| {
            router
                .handle(&RequestBuilder::get("led").build())
                .unwrap()
                .payload
        };

        let non = RequestBuilder::put("led")
            .payload(b"2".to_vec())
            .non_confirmable()
            .build();
        assert!(router.handle(&non).is_none());
        assert_eq!(state(&router), b"1");

        let con = RequestBuilder::put("led").payload(b"2".to_vec()).build();
        let response = router.handle(&con).unwrap();
        assert_eq!(response.header.get_type(), MessageType::Acknowledgement);
        assert_eq!(response.header.code, MessageClass::Response(ResponseType::Changed));
        assert_eq!(response.payload, b"0");
        assert_eq!(state(&router), b"0");
    }

    #[test]
    fn test_get_reports_state() {
        let led = LedResource::new();
        let reply = led.get(&RequestBuilder::get("led").build());
        assert_eq!(reply.status, ResponseType::Content);
        assert_eq!(reply.payload, b"0");
    }
}
