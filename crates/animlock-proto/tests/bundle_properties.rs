//! Property-based tests for bundle encoding and framer resynchronization.
//!
//! These exercise the round-trip and recovery guarantees for arbitrary
//! inputs, not just hand-picked examples.

use animlock_proto::framer::{self, FramerItem};
use animlock_proto::{BUNDLE_MAGIC_A, Bundle};
use bytes::Bytes;
use proptest::prelude::*;

fn arbitrary_bundle() -> impl Strategy<Value = Bundle> {
    (
        any::<u64>(),
        any::<u16>(),
        any::<u8>(),
        any::<bool>(),
        any::<[u8; 2]>(),
        any::<[u8; 6]>(),
        prop::collection::vec(any::<u8>(), 0..1024),
    )
        .prop_map(
            |(timestamp, conn_type, encoding, zlib_compressed, unknown1, unknown2, messages)| {
                Bundle {
                    timestamp,
                    conn_type,
                    encoding,
                    zlib_compressed,
                    magic: BUNDLE_MAGIC_A,
                    message_count: 1,
                    unknown1,
                    unknown2,
                    messages: Bytes::from(messages),
                }
            },
        )
}

fn garbage_without_magic() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(1u8..=1u8, 0..64)
}

proptest! {
    #[test]
    fn bundle_round_trip_is_bit_exact(bundle in arbitrary_bundle()) {
        let mut encoded = Vec::new();
        bundle.encode(&mut encoded).expect("encode should succeed");

        let (decoded, consumed) = Bundle::decode(&encoded).expect("decode should succeed");
        prop_assert_eq!(consumed, encoded.len());
        prop_assert_eq!(decoded.messages.clone(), bundle.messages);
        prop_assert_eq!(decoded.timestamp, bundle.timestamp);
        prop_assert_eq!(decoded.conn_type, bundle.conn_type);
        prop_assert_eq!(decoded.zlib_compressed, bundle.zlib_compressed);
        prop_assert_eq!(decoded.unknown1, bundle.unknown1);
        prop_assert_eq!(decoded.unknown2, bundle.unknown2);

        let mut re_encoded = Vec::new();
        decoded.encode(&mut re_encoded).expect("re-encode should succeed");
        prop_assert_eq!(encoded, re_encoded);
    }

    #[test]
    fn framer_reports_pure_garbage_as_single_discard(garbage in garbage_without_magic()) {
        let (items, tail) = framer::scan(&garbage);
        prop_assert!(tail.is_empty());
        if garbage.is_empty() {
            prop_assert!(items.is_empty());
        } else {
            prop_assert_eq!(items.len(), 1);
            prop_assert!(matches!(&items[0], FramerItem::Discarded(b) if b.as_ref() == garbage.as_slice()));
        }
    }

    #[test]
    fn framer_recovers_bundle_after_garbage_prefix(
        prefix in garbage_without_magic(),
        bundle in arbitrary_bundle(),
    ) {
        let mut encoded_bundle = Vec::new();
        bundle.encode(&mut encoded_bundle).expect("encode should succeed");

        let mut stream = prefix.clone();
        stream.extend_from_slice(&encoded_bundle);

        let (items, tail) = framer::scan(&stream);
        prop_assert!(tail.is_empty());

        let bundle_items: Vec<_> =
            items.iter().filter(|item| matches!(item, FramerItem::Bundle(_))).collect();
        prop_assert_eq!(bundle_items.len(), 1);

        if !prefix.is_empty() {
            prop_assert!(matches!(&items[0], FramerItem::Discarded(b) if b.as_ref() == prefix.as_slice()));
        }
    }
}
