//! CoAP server for Thread sensor telemetry
//!
//! A single UDP receive loop dispatches requests to [`Resource`]s by
//! Uri-Path. Two resources are provided:
//!
//! - [`SensorResource`] at `/sensor`: accepts JSON measurements (`id`,
//!   `temp`, `press`, `hum`), prints them and always answers with an empty
//!   `2.04 Changed`.
//! - [`LedResource`] at `/led`: a software LED that accepts `0`, `1` and `2`
//!   (off, on, toggle) and reports its state.
//!
//! # Example
//!
//! ```no_run
//! use otcoap_server::{CoapServer, LedResource, Router, SensorResource};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let router = Router::new()
//!         .resource("sensor", SensorResource::new())
//!         .resource("led", LedResource::new());
//!
//!     let server = CoapServer::bind("[::]:5683".parse()?).await?;
//!     server.run(router, CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod led;
pub mod resource;
pub mod sensor;
pub mod server;

pub use error::{Result, ServerError};
pub use led::LedResource;
pub use resource::{Reply, Resource, Router};
pub use sensor::{IngestError, SensorResource};
pub use server::{CoapServer, ServerStats};
