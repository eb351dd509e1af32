//! Property-based tests for Vaultdrop
//!
//! Uses proptest to verify invariants across large input spaces.

use proptest::prelude::*;

// ============================================================================
// Nonce Derivation Properties
// ============================================================================

mod nonce_properties {
    use super::*;
    use vaultdrop_crypto::{Nonce, chunk_nonce};

    proptest! {
        /// Distinct chunk indices never share a nonce under one base
        #[test]
        fn chunk_nonces_distinct(base in any::<[u8; 24]>(), a in any::<u64>(), b in any::<u64>()) {
            prop_assume!(a != b);
            let base = Nonce::from_bytes(base);
            let (na, nb) = (chunk_nonce(&base, a), chunk_nonce(&base, b));
            prop_assert_ne!(na.as_bytes(), nb.as_bytes());
        }

        /// Derivation only touches the first eight bytes
        #[test]
        fn chunk_nonce_keeps_tail(base in any::<[u8; 24]>(), index in any::<u64>()) {
            let derived = chunk_nonce(&Nonce::from_bytes(base), index);
            prop_assert_eq!(&derived.as_bytes()[8..], &base[8..]);
        }
    }
}

// ============================================================================
// Transfer Properties
// ============================================================================

mod transfer_properties {
    use super::*;
    use vaultdrop_transfer::chunker::chunk_count;
    use vaultdrop_transfer::{CHUNK_SIZE, ChannelFrame, TransferError, TransferReceiver, TransferSender};

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    fn sealed_frames(data: &[u8]) -> Vec<ChannelFrame> {
        runtime().block_on(async {
            let capacity = chunk_count(data.len() as u64) as usize + 2;
            let (mut tx, mut rx) = tokio::sync::mpsc::channel(capacity);
            TransferSender::default()
                .send(&mut tx, "blob.bin", None, data)
                .await
                .unwrap();
            drop(tx);

            let mut frames = Vec::new();
            while let Some(frame) = rx.recv().await {
                frames.push(frame);
            }
            frames
        })
    }

    fn feed(frames: Vec<ChannelFrame>) -> Result<Vec<u8>, TransferError> {
        let mut receiver = TransferReceiver::new();
        for frame in frames {
            if let Some(file) = receiver.handle_frame(frame)? {
                return Ok(file.data);
            }
        }
        Err(TransferError::ChannelClosed)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Whatever goes in comes out, one frame per chunk plus two control frames
        #[test]
        fn transfer_roundtrip(data in prop::collection::vec(any::<u8>(), 0..3 * CHUNK_SIZE)) {
            let frames = sealed_frames(&data);
            prop_assert_eq!(frames.len() as u64, chunk_count(data.len() as u64) + 2);
            prop_assert_eq!(feed(frames).unwrap(), data);
        }

        /// Flipping any ciphertext bit is rejected at that chunk
        #[test]
        fn tampering_detected(
            data in prop::collection::vec(any::<u8>(), 1..2 * CHUNK_SIZE),
            pick in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let mut frames = sealed_frames(&data);
            let chunks = frames.len() - 2;
            let target = 1 + pick.index(chunks);
            if let ChannelFrame::Binary(sealed) = &mut frames[target] {
                let offset = pick.index(sealed.len());
                sealed[offset] ^= 1 << bit;
            }

            let expected = (target - 1) as u64;
            let err = feed(frames).unwrap_err();
            let at_target = matches!(err, TransferError::Decryption { index } if index == expected);
            prop_assert!(at_target, "expected Decryption {{ index: {} }}, got {:?}", expected, err);
        }

        /// Dropping any chunk frame fails the transfer
        #[test]
        fn missing_chunk_detected(
            data in prop::collection::vec(any::<u8>(), 1..3 * CHUNK_SIZE),
            pick in any::<prop::sample::Index>(),
        ) {
            let mut frames = sealed_frames(&data);
            let chunks = frames.len() - 2;
            frames.remove(1 + pick.index(chunks));
            prop_assert!(feed(frames).is_err());
        }
    }
}

// ============================================================================
// Signaling Message Properties
// ============================================================================

mod signal_properties {
    use super::*;
    use vaultdrop_signal::SignalMessage;

    proptest! {
        /// Arbitrary input never panics the parser
        #[test]
        fn parse_never_panics(text in ".{0,256}") {
            let _ = SignalMessage::from_json(&text);
        }

        /// Negotiation payloads pass through byte-for-byte
        #[test]
        fn negotiation_payload_verbatim(sdp in "[ -~]{0,128}", kind in 0u8..3) {
            let kind = ["offer", "answer", "ice"][kind as usize];
            let payload = serde_json::json!({"sdp": sdp}).to_string();
            let text = format!(r#"{{"type":"{kind}","payload":{payload}}}"#);

            let msg = SignalMessage::from_json(&text).unwrap();
            prop_assert_eq!(msg.message_type(), kind);
            let out: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
            prop_assert_eq!(out["payload"].to_string(), payload);
        }
    }
}
