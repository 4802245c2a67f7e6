//! End-to-end signaling tests: two clients negotiate through a live
//! in-process relay.
//!
//! Validates the full control flow from the spec of the system: caller
//! emits an offer, relay forwards it, callee answers, relay forwards the
//! answer, then candidates trickle in both directions.

use std::time::Duration;

use serde_json::json;

use peercall::channel::SignalChannel;
use peercall::media::loopback::LoopbackMedia;
use peercall::negotiation::{Negotiation, NegotiationPhase};
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
async fn offer_answer_exchange_connects_both_sides() {
    let (url, _handle) = start_relay().await;

    let chan_a = SignalChannel::connect(&url).await.unwrap();
    let chan_b = SignalChannel::connect(&url).await.unwrap();

    let mut caller = Negotiation::new(LoopbackMedia::new("caller"));
    let mut callee = Negotiation::new(LoopbackMedia::new("callee"));

    // Caller starts: offer goes out through the relay.
    let offer = caller.start().await.unwrap();
    chan_a.send(&offer).await.unwrap();
    assert_eq!(caller.phase(), NegotiationPhase::OfferSent);

    // Callee consumes the offer and emits exactly one answer.
    let inbound = recv(&chan_b).await;
    let reply = callee.handle(inbound).await.unwrap();
    let answer = reply.expect("callee must answer the offer");
    assert!(matches!(answer, SignalMessage::Answer { .. }));
    assert_eq!(callee.phase(), NegotiationPhase::Connected);
    chan_b.send(&answer).await.unwrap();

    // Caller consumes the answer and connects.
    let inbound = recv(&chan_a).await;
    let reply = caller.handle(inbound).await.unwrap();
    assert!(reply.is_none());
    assert_eq!(caller.phase(), NegotiationPhase::Connected);

    // Each side applied the other's description.
    assert!(
        caller.media().remote_description().unwrap()["sdp"]
            .as_str()
            .unwrap()
            .contains("callee")
    );
    assert!(
        callee.media().remote_description().unwrap()["sdp"]
            .as_str()
            .unwrap()
            .contains("caller")
    );
}

#[tokio::test]
async fn candidates_trickle_in_both_directions_after_connect() {
    let (url, _handle) = start_relay().await;

    let chan_a = SignalChannel::connect(&url).await.unwrap();
    let chan_b = SignalChannel::connect(&url).await.unwrap();

    let mut caller = Negotiation::new(LoopbackMedia::new("caller"));
    let mut callee = Negotiation::new(LoopbackMedia::new("callee"));

    // Complete the offer/answer exchange.
    let offer = caller.start().await.unwrap();
    chan_a.send(&offer).await.unwrap();
    let answer = callee.handle(recv(&chan_b).await).await.unwrap().unwrap();
    chan_b.send(&answer).await.unwrap();
    caller.handle(recv(&chan_a).await).await.unwrap();

    // Candidates keep flowing after negotiation completes.
    chan_a
        .send(&SignalMessage::Candidate {
            candidate: json!({ "sdpMid": "0", "candidate": "candidate:a" }),
        })
        .await
        .unwrap();
    chan_b
        .send(&SignalMessage::Candidate {
            candidate: json!({ "sdpMid": "0", "candidate": "candidate:b" }),
        })
        .await
        .unwrap();

    callee.handle(recv(&chan_b).await).await.unwrap();
    caller.handle(recv(&chan_a).await).await.unwrap();

    assert_eq!(caller.phase(), NegotiationPhase::Connected);
    assert_eq!(callee.phase(), NegotiationPhase::Connected);
    assert_eq!(
        caller.media().applied_candidates()[0]["candidate"],
        "candidate:b"
    );
    assert_eq!(
        callee.media().applied_candidates()[0]["candidate"],
        "candidate:a"
    );
}

#[tokio::test]
async fn bad_candidate_does_not_disrupt_established_session() {
    let (url, _handle) = start_relay().await;

    let chan_a = SignalChannel::connect(&url).await.unwrap();
    let chan_b = SignalChannel::connect(&url).await.unwrap();

    let mut caller = Negotiation::new(LoopbackMedia::new("caller"));
    let mut callee = Negotiation::new(LoopbackMedia::new("callee"));

    let offer = caller.start().await.unwrap();
    chan_a.send(&offer).await.unwrap();
    let answer = callee.handle(recv(&chan_b).await).await.unwrap().unwrap();
    chan_b.send(&answer).await.unwrap();
    caller.handle(recv(&chan_a).await).await.unwrap();

    // The callee's media rejects the next candidate; the session survives.
    callee.media().reject_candidates(true);
    chan_a
        .send(&SignalMessage::Candidate { candidate: json!("stale") })
        .await
        .unwrap();
    let result = callee.handle(recv(&chan_b).await).await;

    assert!(result.is_ok());
    assert_eq!(callee.phase(), NegotiationPhase::Connected);

    // A later, valid candidate still applies.
    callee.media().reject_candidates(false);
    chan_a
        .send(&SignalMessage::Candidate { candidate: json!("fresh") })
        .await
        .unwrap();
    callee.handle(recv(&chan_b).await).await.unwrap();
    assert_eq!(callee.media().applied_candidates(), vec![json!("fresh")]);
}

#[tokio::test]
async fn hang_up_releases_media_and_leaves_peer_channel_open() {
    let (url, _handle) = start_relay().await;

    let chan_a = SignalChannel::connect(&url).await.unwrap();
    let chan_b = SignalChannel::connect(&url).await.unwrap();

    let mut caller = Negotiation::new(LoopbackMedia::new("caller"));
    let mut callee = Negotiation::new(LoopbackMedia::new("callee"));

    let offer = caller.start().await.unwrap();
    chan_a.send(&offer).await.unwrap();
    let answer = callee.handle(recv(&chan_b).await).await.unwrap().unwrap();
    chan_b.send(&answer).await.unwrap();
    caller.handle(recv(&chan_a).await).await.unwrap();

    // Caller hangs up and drops its relay connection.
    caller.end().await.unwrap();
    assert_eq!(caller.phase(), NegotiationPhase::Closed);
    assert!(caller.media().is_closed());
    drop(chan_a);

    tokio::time::sleep(Duration::from_millis(100)).await;

    // The relay sends no peer-left notification; the callee's channel stays
    // up and its sends are silently dropped until a new peer pairs with it.
    assert!(chan_b.is_connected());
    chan_b
        .send(&SignalMessage::Candidate { candidate: json!("Y") })
        .await
        .unwrap();
}
