//! Button presses against a loopback LED

mod common;

use common::LedPeer;
use otcoap_client::Button;
use otcoap_coap::{encode, RequestBuilder};
use otcoap_core::config::{ButtonConfig, ClientConfig};
use std::time::Duration;
use tokio::net::UdpSocket;

fn button(target: std::net::SocketAddr) -> Button {
    Button::new(
        ButtonConfig { target },
        ClientConfig {
            path: "led".to_string(),
            payload: "2".to_string(),
            timeout_ms: 2000,
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_press_toggles_led() {
    let peer = LedPeer::start().await;
    let button = button(peer.addr);

    let report = button.press().await.unwrap().expect("unicast press is answered");
    assert_eq!(
        report.lines(),
        ["Response code: 2.04", "Response payload: 1"]
    );

    let report = button.press().await.unwrap().unwrap();
    assert_eq!(report.payload, b"0");

    peer.stop().await;
}

#[tokio::test]
async fn test_non_confirmable_put_gets_no_answer() {
    let peer = LedPeer::start().await;

    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let request = RequestBuilder::put("led")
        .non_confirmable()
        .payload(b"1".to_vec())
        .build();
    socket
        .send_to(&encode(&request).unwrap(), peer.addr)
        .await
        .unwrap();

    let mut buffer = [0u8; 1500];
    let answer =
        tokio::time::timeout(Duration::from_millis(200), socket.recv_from(&mut buffer)).await;
    assert!(answer.is_err(), "LED answered a non-confirmable PUT");

    // the LED is on now, so a toggle turns it off
    let report = button(peer.addr).press().await.unwrap().unwrap();
    assert_eq!(report.payload, b"0");

    peer.stop().await;
}
