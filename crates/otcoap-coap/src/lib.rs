//! CoAP message helpers for the otcoap tools
//!
//! The wire format itself comes from `coap-lite`. This crate adds the few
//! operations the server and the one-shot client share: building requests
//! with fresh tokens, deriving responses and empty ACKs from a request,
//! extracting the Uri-Path and rendering response codes as `c.dd`.
//!
//! # Example
//!
//! ```rust
//! use otcoap_coap::{decode, encode, uri_path, RequestBuilder, RequestType};
//!
//! let request = RequestBuilder::put("led").payload(b"2".to_vec()).build();
//! let bytes = encode(&request).unwrap();
//!
//! let decoded = decode(&bytes).unwrap();
//! assert_eq!(uri_path(&decoded), "led");
//! assert_eq!(decoded.payload, b"2");
//! ```

pub mod message;

pub use coap_lite::{
    CoapOption, ContentFormat, MessageClass, MessageType, Packet, RequestType, ResponseType,
};
pub use message::{
    decode, empty_ack, encode, format_code, is_request, new_message_id, new_token,
    response_to, uri_path, CodecError, RequestBuilder,
};
