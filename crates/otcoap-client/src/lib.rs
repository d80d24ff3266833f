//! # otcoap-client
//!
//! CoAP client side of the otcoap tools.
//!
//! - **One-shot exchange**: [`send_one_shot`] sends a single confirmable PUT
//!   and waits, bounded by a timeout, for the matching response
//! - **Dispatch**: [`Dispatcher`] applies a configured request to services
//!   found by discovery
//! - **Multicast**: [`MulticastSubscription`] joins an IPv6 multicast group
//! - **Telemetry**: [`SensorPublisher`] sends sensor measurements to `/sensor`
//! - **Button**: [`Button`] sends the configured request to a fixed peer or
//!   multicast group
//!
//! Requests are never retransmitted. A lost request or response surfaces as
//! [`ClientError::Timeout`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use otcoap_client::send_one_shot;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let target = "[fd00::1]:5683".parse()?;
//!     let report = send_one_shot(target, "led", b"2", Duration::from_secs(10)).await?;
//!
//!     for line in report.lines() {
//!         println!("{line}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod button;
pub mod dispatcher;
pub mod error;
pub mod exchange;
pub mod multicast;
pub mod publisher;
mod socket;

pub use button::Button;
pub use dispatcher::Dispatcher;
pub use error::{ClientError, Result};
pub use exchange::{send_one_shot, ExchangeReport};
pub use multicast::MulticastSubscription;
pub use publisher::{SensorPublisher, SENSOR_PATH};
