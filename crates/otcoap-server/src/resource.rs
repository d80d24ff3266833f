//! Resources and path routing

use otcoap_coap::{
    format_code, response_to, uri_path, MessageClass, MessageType, Packet, RequestType,
    ResponseType,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// What a resource answers to a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Response code
    pub status: ResponseType,

    /// Response body
    pub payload: Vec<u8>,

    /// Do not answer non-confirmable requests (CoAP No-Response semantics).
    /// Confirmable requests are always acknowledged.
    pub no_response: bool,
}

impl Reply {
    pub fn new(status: ResponseType) -> Self {
        Self {
            status,
            payload: Vec::new(),
            no_response: false,
        }
    }

    /// `2.04 Changed` without a body.
    pub fn changed() -> Self {
        Self::new(ResponseType::Changed)
    }

    /// `2.05 Content` carrying a body.
    pub fn content(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(ResponseType::Content).with_payload(payload)
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn no_response(mut self) -> Self {
        self.no_response = true;
        self
    }
}

/// A CoAP resource.
///
/// Handlers run on the receive loop and must not block.
pub trait Resource: Send + Sync {
    fn get(&self, _request: &Packet) -> Reply {
        Reply::new(ResponseType::MethodNotAllowed)
    }

    fn put(&self, _request: &Packet) -> Reply {
        Reply::new(ResponseType::MethodNotAllowed)
    }
}

/// Maps Uri-Paths to resources.
#[derive(Clone, Default)]
pub struct Router {
    resources: HashMap<String, Arc<dyn Resource>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource. Leading and trailing slashes are ignored.
    pub fn resource(mut self, path: &str, resource: impl Resource + 'static) -> Self {
        self.resources
            .insert(path.trim_matches('/').to_string(), Arc::new(resource));
        self
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.resources.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Produces the message to send back for an inbound packet, if any.
    pub fn handle(&self, packet: &Packet) -> Option<Packet> {
        let method = match packet.header.code {
            MessageClass::Request(method) => method,
            MessageClass::Empty if packet.header.get_type() == MessageType::Confirmable => {
                // CoAP ping
                return Some(reset_for(packet));
            }
            other => {
                debug!(code = %format_code(other), "Ignoring non-request message");
                return None;
            }
        };

        let path = uri_path(packet);
        let reply = match self.resources.get(&path) {
            Some(resource) => match method {
                RequestType::Get => resource.get(packet),
                RequestType::Put => resource.put(packet),
                _ => Reply::new(ResponseType::MethodNotAllowed),
            },
            None => Reply::new(ResponseType::NotFound),
        };

        debug!(
            path = %path,
            method = ?method,
            status = ?reply.status,
            "Handled request"
        );

        if reply.no_response && packet.header.get_type() == MessageType::NonConfirmable {
            return None;
        }

        response_to(packet, reply.status, reply.payload)
    }
}

fn reset_for(packet: &Packet) -> Packet {
    let mut reset = Packet::new();
    reset.header.set_type(MessageType::Reset);
    reset.header.code = MessageClass::Empty;
    reset.header.message_id = packet.header.message_id;
    reset
}
