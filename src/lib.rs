//! # otcoap
//!
//! Tools for CoAP peers on a Thread network: a telemetry server, an mDNS
//! browser, a discover-and-invoke client, a multicast subscriber and a
//! sensor publisher.
//!
//! The flows that tie discovery to the client live here so they can run
//! against any [`Resolve`] implementation and any event stream, not only a
//! live mDNS bus.

use anyhow::Result;
use async_channel::Receiver;
use otcoap_client::{Dispatcher, ExchangeReport};
use otcoap_core::config::{LogFormat, LoggingConfig, ServerConfig};
use otcoap_discovery::{BrowseEvent, BrowseSummary, Listener, Resolve};
use otcoap_server::{LedResource, Router, SensorResource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub use otcoap_client as client;
pub use otcoap_coap as coap;
pub use otcoap_core as core;
pub use otcoap_discovery as discovery;
pub use otcoap_server as server;

/// Shown by `multicast` while the group is joined.
pub const SUBSCRIPTION_PROMPT: &str = "Press any key to end the subscription.";

/// Header printed when browsing starts, followed by a blank line.
pub fn browse_banner(service_type: &str) -> String {
    format!("Browsing {} service(s), press Ctrl-C to exit...\n", service_type)
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Logs go to stderr so the
/// tool output on stdout stays clean. A second call is a no-op.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let level = config.parse_level()?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // ignore if already initialized
    let _ = match config.format {
        LogFormat::Text => builder.with_target(false).try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    Ok(())
}

/// Builds the resource tree served by the `server` command.
pub fn server_router(config: &ServerConfig) -> Router {
    let router = Router::new().resource("sensor", SensorResource::new());
    if config.enable_led {
        router.resource("led", LedResource::new())
    } else {
        router
    }
}

/// Browses until the first added instance answers the configured request.
///
/// Every added instance that resolves gets one dispatch attempt. Failed
/// attempts are logged and browsing goes on. The first successful exchange
/// prints its two report lines, stops browsing and is returned. `None`
/// means the stream closed or `cancel` fired before any exchange succeeded.
pub async fn discover_and_invoke<R: Resolve + 'static>(
    events: Receiver<BrowseEvent>,
    resolver: Arc<R>,
    resolve_timeout: Duration,
    dispatcher: Dispatcher,
    cancel: CancellationToken,
) -> Option<ExchangeReport> {
    let done = cancel.child_token();
    let outcome: Arc<Mutex<Option<ExchangeReport>>> = Arc::new(Mutex::new(None));
    let dispatcher = Arc::new(dispatcher);

    let on_added = {
        let done = done.clone();
        let outcome = Arc::clone(&outcome);
        move |service: otcoap_core::ServiceAnnouncement| {
            let done = done.clone();
            let outcome = Arc::clone(&outcome);
            let dispatcher = Arc::clone(&dispatcher);
            async move {
                if done.is_cancelled() {
                    return;
                }

                match dispatcher.dispatch(&service).await {
                    Ok(report) => {
                        let mut outcome = outcome.lock().await;
                        if outcome.is_none() {
                            for line in report.lines() {
                                println!("{line}");
                            }
                            *outcome = Some(report);
                            done.cancel();
                        }
                    }
                    Err(e) => {
                        warn!(
                            service = %service.name,
                            address = %service.address,
                            error = %e,
                            "Dispatch failed, still browsing"
                        );
                    }
                }
            }
        }
    };

    let summary = Listener::new(resolver, resolve_timeout)
        .run(events, on_added, done)
        .await;

    info!(?summary, "Browsing finished");

    let report = outcome.lock().await.take();
    report
}

/// Prints every added instance that resolves, until the stream closes or
/// `cancel` fires.
pub async fn browse_and_print<R: Resolve + 'static>(
    events: Receiver<BrowseEvent>,
    resolver: Arc<R>,
    resolve_timeout: Duration,
    cancel: CancellationToken,
) -> BrowseSummary {
    let summary = Listener::new(resolver, resolve_timeout)
        .run(
            events,
            |service| async move {
                for line in service.lines() {
                    println!("{line}");
                }
            },
            cancel,
        )
        .await;

    info!(?summary, "Browsing finished");
    summary
}
