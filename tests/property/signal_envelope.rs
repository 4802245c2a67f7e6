//! Property-based tests for the signaling envelope codec.
//!
//! Uses proptest to verify:
//! 1. Any JSON payload survives encode → decode unmodified, for every
//!    message type — the opaque pass-through contract.
//! 2. Arbitrary text never causes a panic in `decode` (returns `Err`
//!    gracefully for non-envelopes).

use proptest::prelude::*;
use peercall_proto::signal::{self, SignalMessage};

/// Strategy for arbitrary opaque JSON payloads (no floats, which do not
/// round-trip exactly through text).
fn arb_payload() -> impl Strategy<Value = serde_json::Value> {
    let leaf = prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::from),
        any::<i64>().prop_map(serde_json::Value::from),
        "[a-zA-Z0-9 :/.=+-]{0,40}".prop_map(serde_json::Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::from),
            prop::collection::btree_map("[a-zA-Z]{1,10}", inner, 0..4)
                .prop_map(|m| serde_json::Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Strategy for arbitrary signaling messages.
fn arb_signal_message() -> impl Strategy<Value = SignalMessage> {
    prop_oneof![
        arb_payload().prop_map(|offer| SignalMessage::Offer { offer }),
        arb_payload().prop_map(|answer| SignalMessage::Answer { answer }),
        arb_payload().prop_map(|candidate| SignalMessage::Candidate { candidate }),
    ]
}

proptest! {
    #[test]
    fn payload_survives_round_trip(msg in arb_signal_message()) {
        let text = signal::encode(&msg).unwrap();
        let decoded = signal::decode(&text).unwrap();
        prop_assert_eq!(msg, decoded);
    }

    #[test]
    fn decode_never_panics_on_arbitrary_text(text in ".{0,256}") {
        // Err is fine; a panic is not.
        let _ = signal::decode(&text);
    }

    #[test]
    fn decode_rejects_untagged_objects(payload in arb_payload()) {
        // A bare payload without the envelope tag is not a signal message.
        let text = serde_json::to_string(&serde_json::json!({ "payload": payload })).unwrap();
        prop_assert!(signal::decode(&text).is_err());
    }
}
