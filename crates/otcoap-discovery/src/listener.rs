//! Discovery listener: resolve added instances and hand them to a callback

use crate::types::{BrowseEvent, BrowseSummary, ServiceStateChange};
use async_channel::Receiver;
use async_trait::async_trait;
use otcoap_core::ServiceAnnouncement;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Resolves a service instance to an address and port.
#[async_trait]
pub trait Resolve: Send + Sync {
    /// Returns `None` when nothing is known about the instance within `timeout`.
    async fn resolve(
        &self,
        service_type: &str,
        name: &str,
        timeout: Duration,
    ) -> Option<ServiceAnnouncement>;
}

/// Reacts to `Added` notifications on a discovery bus.
///
/// Every added instance is resolved on its own task and, when resolution
/// succeeds, passed to the callback. `Updated` and `Removed` notifications
/// are logged and otherwise ignored. Nothing is retried.
pub struct Listener<R> {
    resolver: Arc<R>,
    resolve_timeout: Duration,
}

impl<R: Resolve + 'static> Listener<R> {
    pub fn new(resolver: Arc<R>, resolve_timeout: Duration) -> Self {
        Self {
            resolver,
            resolve_timeout,
        }
    }

    /// Consumes `events` until the stream closes or `cancel` fires.
    ///
    /// When the stream closes, outstanding resolutions are awaited. When
    /// `cancel` fires, they are aborted.
    pub async fn run<F, Fut>(
        &self,
        events: Receiver<BrowseEvent>,
        on_added: F,
        cancel: CancellationToken,
    ) -> BrowseSummary
    where
        F: Fn(ServiceAnnouncement) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let on_added = Arc::new(on_added);
        let mut tasks: JoinSet<bool> = JoinSet::new();
        let mut summary = BrowseSummary::default();

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(pending = tasks.len(), "Listener cancelled");
                    tasks.abort_all();
                    return summary;
                }
                Some(done) = tasks.join_next(), if !tasks.is_empty() => {
                    record(&mut summary, done);
                    continue;
                }
                event = events.recv() => match event {
                    Ok(event) => event,
                    Err(_) => break,
                },
            };

            println!("{event}");
            info!(
                service = %event.name,
                service_type = %event.service_type,
                change = %event.change,
                "Service state changed"
            );

            match event.change {
                ServiceStateChange::Added => {
                    summary.added += 1;

                    let resolver = Arc::clone(&self.resolver);
                    let on_added = Arc::clone(&on_added);
                    let timeout = self.resolve_timeout;

                    tasks.spawn(async move {
                        match resolver
                            .resolve(&event.service_type, &event.name, timeout)
                            .await
                        {
                            Some(service) => {
                                (*on_added)(service).await;
                                true
                            }
                            None => {
                                println!("  No info");
                                warn!(
                                    service = %event.name,
                                    timeout_ms = timeout.as_millis() as u64,
                                    "Service did not resolve"
                                );
                                false
                            }
                        }
                    });
                }
                ServiceStateChange::Updated => summary.updated += 1,
                ServiceStateChange::Removed => summary.removed += 1,
            }
        }

        debug!(pending = tasks.len(), "Event stream closed, draining");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    break;
                }
                done = tasks.join_next() => match done {
                    Some(done) => record(&mut summary, done),
                    None => break,
                },
            }
        }

        summary
    }
}

fn record(summary: &mut BrowseSummary, done: Result<bool, JoinError>) {
    match done {
        Ok(true) => summary.resolved += 1,
        Ok(false) => summary.unresolved += 1,
        Err(e) if e.is_panic() => error!(error = %e, "Resolution task panicked"),
        Err(_) => {}
    }
}
