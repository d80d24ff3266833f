//! Discover-and-invoke flow against loopback peers

mod common;

use common::{LedPeer, StaticResolver, SERVICE_TYPE};
use otcoap::discover_and_invoke;
use otcoap_client::Dispatcher;
use otcoap_core::config::ClientConfig;
use otcoap_discovery::BrowseEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

const RESOLVE_TIMEOUT: Duration = Duration::from_millis(3000);

fn toggle_client(timeout_ms: u64) -> Dispatcher {
    Dispatcher::new(ClientConfig {
        path: "led".to_string(),
        payload: "2".to_string(),
        timeout_ms,
    })
}

fn closed_stream(events: Vec<BrowseEvent>) -> async_channel::Receiver<BrowseEvent> {
    let (tx, rx) = async_channel::unbounded();
    for event in events {
        tx.try_send(event).unwrap();
    }
    rx
}

#[tokio::test]
async fn test_toggle_discovered_led() {
    let peer = LedPeer::start().await;
    let resolver = Arc::new(StaticResolver::new().with("ot-service", peer.addr));

    let report = discover_and_invoke(
        closed_stream(vec![BrowseEvent::added(SERVICE_TYPE, "ot-service")]),
        Arc::clone(&resolver),
        RESOLVE_TIMEOUT,
        toggle_client(2000),
        CancellationToken::new(),
    )
    .await
    .expect("exchange should succeed");

    assert_eq!(
        report.lines(),
        ["Response code: 2.04", "Response payload: 1"]
    );

    // second run toggles back
    let report = discover_and_invoke(
        closed_stream(vec![BrowseEvent::added(SERVICE_TYPE, "ot-service")]),
        resolver,
        RESOLVE_TIMEOUT,
        toggle_client(2000),
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(report.payload, b"0");

    peer.stop().await;
}

#[tokio::test]
async fn test_failed_dispatch_keeps_browsing() {
    let peer = LedPeer::start().await;
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let resolver = Arc::new(
        StaticResolver::new()
            .with("mute", silent.local_addr().unwrap())
            .with("ot-service", peer.addr),
    );

    let (tx, rx) = async_channel::unbounded();
    tx.send(BrowseEvent::added(SERVICE_TYPE, "mute")).await.unwrap();

    let sender = tokio::spawn(async move {
        // the first peer has timed out by now
        tokio::time::sleep(Duration::from_millis(400)).await;
        tx.send(BrowseEvent::added(SERVICE_TYPE, "ot-service"))
            .await
            .unwrap();
        tx
    });

    let report = discover_and_invoke(
        rx,
        resolver,
        RESOLVE_TIMEOUT,
        toggle_client(200),
        CancellationToken::new(),
    )
    .await
    .expect("second peer should answer");

    assert_eq!(report.code_string(), "2.04");
    assert_eq!(report.payload, b"1");

    drop(sender.await.unwrap());
    peer.stop().await;
}

#[tokio::test]
async fn test_removed_and_unresolved_take_no_action() {
    let peer = LedPeer::start().await;
    let resolver = Arc::new(StaticResolver::new().with("ot-service", peer.addr));

    let report = discover_and_invoke(
        closed_stream(vec![
            BrowseEvent::removed(SERVICE_TYPE, "ot-service"),
            BrowseEvent::updated(SERVICE_TYPE, "ot-service"),
            BrowseEvent::added(SERVICE_TYPE, "unknown"),
        ]),
        resolver,
        RESOLVE_TIMEOUT,
        toggle_client(500),
        CancellationToken::new(),
    )
    .await;

    assert!(report.is_none());
    peer.stop().await;
}

#[tokio::test]
async fn test_cancel_stops_browsing() {
    let (_tx, rx) = async_channel::unbounded::<BrowseEvent>();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(2),
        discover_and_invoke(
            rx,
            Arc::new(StaticResolver::new()),
            RESOLVE_TIMEOUT,
            toggle_client(500),
            cancel,
        ),
    )
    .await
    .expect("cancel should end browsing");

    assert!(report.is_none());
}
