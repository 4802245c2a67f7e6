//! Session admission tests at the client level: the relay admits exactly
//! two concurrent endpoints, refuses the third with no message exchange,
//! and frees slots on disconnect.

use std::time::Duration;

use serde_json::json;

use peercall::channel::{ChannelError, SignalChannel};
use peercall_proto::signal::SignalMessage;

/// Start the relay server in-process and return a ws:// URL.
async fn start_relay() -> (String, tokio::task::JoinHandle<()>) {
    let (addr, handle) = peercall_relay::relay::start_server("127.0.0.1:0")
        .await
        .expect("failed to start relay server");
    (format!("ws://{addr}/ws"), handle)
}

/// Helper: receive with a timeout.
async fn recv(channel: &SignalChannel) -> SignalMessage {
    tokio::time::timeout(Duration::from_secs(5), channel.recv())
        .await
        .expect("recv timed out")
        .expect("channel closed unexpectedly")
}

#[tokio::test]
async fn third_client_refused_while_pair_keeps_working() {
    let (url, _handle) = start_relay().await;

    let a = SignalChannel::connect(&url).await.unwrap();
    let b = SignalChannel::connect(&url).await.unwrap();

    // The third connection is closed with no data exchanged.
    let c = SignalChannel::connect(&url).await.unwrap();
    let refused = tokio::time::timeout(Duration::from_secs(5), c.recv())
        .await
        .expect("close detection timed out");
    assert!(matches!(refused, Err(ChannelError::ConnectionClosed)));

    // A and B remain paired and can still exchange messages.
    a.send(&SignalMessage::Offer { offer: json!("X") })
        .await
        .unwrap();
    assert_eq!(recv(&b).await, SignalMessage::Offer { offer: json!("X") });
}

#[tokio::test]
async fn lone_client_messages_are_dropped_not_buffered() {
    let (url, _handle) = start_relay().await;

    let a = SignalChannel::connect(&url).await.unwrap();
    a.send(&SignalMessage::Candidate { candidate: json!("early") })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // B joins after the fact; the first thing it sees must be the offer,
    // never the earlier candidate.
    let b = SignalChannel::connect(&url).await.unwrap();
    a.send(&SignalMessage::Offer { offer: json!("X") })
        .await
        .unwrap();
    assert_eq!(recv(&b).await, SignalMessage::Offer { offer: json!("X") });
}

#[tokio::test]
async fn disconnect_frees_slot_for_new_client() {
    let (url, _handle) = start_relay().await;

    let a = SignalChannel::connect(&url).await.unwrap();
    let b = SignalChannel::connect(&url).await.unwrap();

    drop(a);
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Sent while unpaired: dropped silently, no error back to B.
    b.send(&SignalMessage::Candidate { candidate: json!("Y") })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // A newcomer takes the freed slot and never sees "Y".
    let c = SignalChannel::connect(&url).await.unwrap();
    b.send(&SignalMessage::Offer { offer: json!("Z") })
        .await
        .unwrap();
    assert_eq!(recv(&c).await, SignalMessage::Offer { offer: json!("Z") });
}
