//! mDNS service discovery for CoAP peers on a Thread network
//!
//! This crate watches a DNS-SD service type and reacts to instances as they
//! come and go:
//! - Browse a service type and receive `Added`/`Updated`/`Removed` notifications
//! - Resolve newly added instances to an address and port, bounded by a timeout
//! - Hand each resolved instance to a caller-supplied callback
//! - Announce a local instance so other peers can find it
//!
//! # Architecture
//!
//! [`MdnsBrowser`] owns the `mdns-sd` daemon and pumps its events into an
//! async channel. [`Listener`] consumes that channel and resolves every
//! added instance on its own task through a [`Resolve`] implementation.
//! Keeping resolution behind a trait lets the listener run against a fake
//! bus in tests.
//!
//! # Example
//!
//! ```no_run
//! use otcoap_core::config::DiscoveryConfig;
//! use otcoap_discovery::{Listener, MdnsBrowser};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = DiscoveryConfig::default();
//!     let (browser, events) = MdnsBrowser::start(&config)?;
//!
//!     let listener = Listener::new(browser.resolver(), config.resolve_timeout());
//!     let summary = listener
//!         .run(events, |service| async move {
//!             println!("{}", service.name);
//!         }, CancellationToken::new())
//!         .await;
//!
//!     println!("{summary:?}");
//!     browser.shutdown()?;
//!     Ok(())
//! }
//! ```

pub mod advertise;
pub mod error;
pub mod listener;
pub mod mdns;
mod scope;
pub mod types;

pub use advertise::Advertiser;
pub use error::{DiscoveryError, Result};
pub use listener::{Listener, Resolve};
pub use mdns::{MdnsBrowser, MdnsResolver};
pub use types::{BrowseEvent, BrowseSummary, ServiceStateChange};
