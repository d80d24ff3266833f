//! Request construction and response derivation

use coap_lite::{
    CoapOption, ContentFormat, MessageClass, MessageType, Packet, RequestType, ResponseType,
};
use thiserror::Error;
use uuid::Uuid;

/// Token length used for outgoing requests.
pub const TOKEN_LEN: usize = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Failed to decode CoAP message: {0}")]
    Decode(String),

    #[error("Failed to encode CoAP message: {0}")]
    Encode(String),
}

/// Decodes a datagram into a packet.
pub fn decode(bytes: &[u8]) -> Result<Packet, CodecError> {
    Packet::from_bytes(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

/// Encodes a packet into a datagram.
pub fn encode(packet: &Packet) -> Result<Vec<u8>, CodecError> {
    packet
        .to_bytes()
        .map_err(|e| CodecError::Encode(e.to_string()))
}

/// Returns a random message id.
pub fn new_message_id() -> u16 {
    let id = Uuid::new_v4();
    let bytes = id.as_bytes();
    u16::from_be_bytes([bytes[0], bytes[1]])
}

/// Returns a random token of [`TOKEN_LEN`] bytes.
pub fn new_token() -> Vec<u8> {
    // bytes 0..6 of a v4 uuid are fully random
    Uuid::new_v4().as_bytes()[2..2 + TOKEN_LEN].to_vec()
}

/// Joins the Uri-Path options of a packet with `/`.
pub fn uri_path(packet: &Packet) -> String {
    packet
        .get_option(CoapOption::UriPath)
        .map(|segments| {
            segments
                .iter()
                .map(|segment| String::from_utf8_lossy(segment).into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}

/// Renders a message code the way CoAP documents write it (`2.04`).
pub fn format_code(code: MessageClass) -> String {
    let raw: u8 = code.into();
    format!("{}.{:02}", raw >> 5, raw & 0x1f)
}

/// Returns true if the packet carries a request method.
pub fn is_request(packet: &Packet) -> bool {
    matches!(packet.header.code, MessageClass::Request(_))
}

/// Derives the response to a request.
///
/// A confirmable request gets a piggybacked ACK with the same message id.
/// A non-confirmable request gets a non-confirmable response with a fresh
/// message id. ACK and RST messages cannot be answered and yield `None`.
pub fn response_to(request: &Packet, status: ResponseType, payload: Vec<u8>) -> Option<Packet> {
    let (message_type, message_id) = match request.header.get_type() {
        MessageType::Confirmable => (MessageType::Acknowledgement, request.header.message_id),
        MessageType::NonConfirmable => (MessageType::NonConfirmable, new_message_id()),
        _ => return None,
    };

    let mut response = Packet::new();
    response.header.set_type(message_type);
    response.header.code = MessageClass::Response(status);
    response.header.message_id = message_id;
    response.set_token(request.get_token().to_vec());
    response.payload = payload;
    Some(response)
}

/// Builds the empty ACK for a confirmable message (used for separate responses).
pub fn empty_ack(message: &Packet) -> Packet {
    let mut ack = Packet::new();
    ack.header.set_type(MessageType::Acknowledgement);
    ack.header.code = MessageClass::Empty;
    ack.header.message_id = message.header.message_id;
    ack
}

/// Builder for outgoing requests.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: RequestType,
    confirmable: bool,
    path: String,
    payload: Vec<u8>,
    content_format: Option<ContentFormat>,
    message_id: Option<u16>,
    token: Option<Vec<u8>>,
}

impl RequestBuilder {
    pub fn new(method: RequestType, path: impl Into<String>) -> Self {
        Self {
            method,
            confirmable: true,
            path: path.into(),
            payload: Vec::new(),
            content_format: None,
            message_id: None,
            token: None,
        }
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(RequestType::Put, path)
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(RequestType::Get, path)
    }

    /// Sends the request as non-confirmable.
    pub fn non_confirmable(mut self) -> Self {
        self.confirmable = false;
        self
    }

    pub fn payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn content_format(mut self, format: ContentFormat) -> Self {
        self.content_format = Some(format);
        self
    }

    pub fn message_id(mut self, message_id: u16) -> Self {
        self.message_id = Some(message_id);
        self
    }

    pub fn token(mut self, token: Vec<u8>) -> Self {
        self.token = Some(token);
        self
    }

    pub fn build(self) -> Packet {
        let mut packet = Packet::new();
        packet.header.set_type(if self.confirmable {
            MessageType::Confirmable
        } else {
            MessageType::NonConfirmable
        });
        packet.header.code = MessageClass::Request(self.method);
        packet.header.message_id = self.message_id.unwrap_or_else(new_message_id);
        packet.set_token(self.token.unwrap_or_else(new_token));

        for segment in self.path.split('/').filter(|s| !s.is_empty()) {
            packet.add_option(CoapOption::UriPath, segment.as_bytes().to_vec());
        }

        if let Some(format) = self.content_format {
            packet.set_content_format(format);
        }

        packet.payload = self.payload;
        packet
    }
}
