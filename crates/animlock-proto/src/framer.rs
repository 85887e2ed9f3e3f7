//! Bundle framer: locates bundle boundaries in an append-only byte stream by
//! magic scanning, tolerating arbitrary garbage and one-byte resync on
//! structurally invalid data.

use bytes::Bytes;

use crate::{
    bundle::{BUNDLE_MAGIC_A, BUNDLE_MAGIC_B, Bundle, BundleHeader},
    errors::CodecError,
};

/// One unit of framer output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramerItem {
    /// A successfully parsed bundle.
    Bundle(Bundle),
    /// A byte span that could not be framed; logged as discarded by the
    /// caller.
    Discarded(Bytes),
}

enum MagicSearch {
    /// A complete 16-byte magic match at this offset.
    Found(usize),
    /// A prefix of a magic constant runs off the end of the buffer at this
    /// offset; more bytes might complete it on a future read.
    PartialAtEnd(usize),
    NotFound,
}

fn find_magic(buf: &[u8]) -> MagicSearch {
    let len = buf.len();
    for i in 0..len {
        let remaining = len - i;
        if remaining >= 16 {
            let window = &buf[i..i + 16];
            if window == BUNDLE_MAGIC_A || window == BUNDLE_MAGIC_B {
                return MagicSearch::Found(i);
            }
        } else {
            let tail = &buf[i..];
            if tail == &BUNDLE_MAGIC_A[..remaining] || tail == &BUNDLE_MAGIC_B[..remaining] {
                return MagicSearch::PartialAtEnd(i);
            }
        }
    }
    MagicSearch::NotFound
}

/// Scan `buf` for bundles, returning the items found and the unconsumed
/// tail. The caller prepends the tail to the next read's bytes.
#[must_use]
pub fn scan(buf: &[u8]) -> (Vec<FramerItem>, Bytes) {
    let mut items = Vec::new();
    let mut offset = 0usize;

    loop {
        match find_magic(&buf[offset..]) {
            MagicSearch::NotFound => {
                if offset < buf.len() {
                    items.push(FramerItem::Discarded(Bytes::copy_from_slice(&buf[offset..])));
                }
                return (items, Bytes::new());
            },
            MagicSearch::PartialAtEnd(rel) => {
                let magic_pos = offset + rel;
                if magic_pos > offset {
                    items.push(FramerItem::Discarded(Bytes::copy_from_slice(
                        &buf[offset..magic_pos],
                    )));
                }
                return (items, Bytes::copy_from_slice(&buf[magic_pos..]));
            },
            MagicSearch::Found(rel) => {
                let magic_pos = offset + rel;
                if magic_pos > offset {
                    items.push(FramerItem::Discarded(Bytes::copy_from_slice(
                        &buf[offset..magic_pos],
                    )));
                }

                if buf.len() - magic_pos < BundleHeader::SIZE {
                    return (items, Bytes::copy_from_slice(&buf[magic_pos..]));
                }

                match Bundle::decode(&buf[magic_pos..]) {
                    Ok((bundle, consumed)) => {
                        items.push(FramerItem::Bundle(bundle));
                        offset = magic_pos + consumed;
                    },
                    Err(CodecError::IncompleteData { .. }) => {
                        return (items, Bytes::copy_from_slice(&buf[magic_pos..]));
                    },
                    Err(CodecError::InvalidData(_)) => {
                        items.push(FramerItem::Discarded(Bytes::copy_from_slice(
                            &buf[magic_pos..magic_pos + 1],
                        )));
                        offset = magic_pos + 1;
                    },
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::BUNDLE_MAX_LENGTH;

    fn valid_bundle_bytes(messages: &[u8]) -> Vec<u8> {
        let bundle = Bundle {
            timestamp: 1,
            conn_type: 0,
            encoding: 0,
            zlib_compressed: false,
            magic: BUNDLE_MAGIC_A,
            message_count: 1,
            unknown1: [0u8; 2],
            unknown2: [0u8; 6],
            messages: Bytes::copy_from_slice(messages),
        };
        let mut out = Vec::new();
        bundle.encode(&mut out).unwrap();
        out
    }

    #[test]
    fn pure_garbage_yields_single_discarded_span() {
        let garbage = b"this has no magic anywhere in it at all".to_vec();
        let (items, tail) = scan(&garbage);
        assert_eq!(items, vec![FramerItem::Discarded(Bytes::copy_from_slice(&garbage))]);
        assert!(tail.is_empty());
    }

    #[test]
    fn garbage_then_bundle_then_suffix_tail() {
        let prefix = b"37-bytes-of-leading-garbage-here!!!!".to_vec();
        assert_eq!(prefix.len(), 37);
        let bundle_bytes = valid_bundle_bytes(b"payload");
        let suffix = b"tail-bytes";

        let mut stream = Vec::new();
        stream.extend_from_slice(&prefix);
        stream.extend_from_slice(&bundle_bytes);
        stream.extend_from_slice(suffix);

        let (items, tail) = scan(&stream);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], FramerItem::Discarded(Bytes::copy_from_slice(&prefix)));
        assert!(matches!(items[1], FramerItem::Bundle(_)));
        assert_eq!(tail.as_ref(), suffix);
    }

    #[test]
    fn fake_magic_with_bad_length_recovers_to_valid_bundle() {
        let mut fake = BUNDLE_MAGIC_A.to_vec();
        fake.extend_from_slice(&0u64.to_le_bytes()); // timestamp
        fake.extend_from_slice(&BUNDLE_MAX_LENGTH.wrapping_add(1).to_le_bytes()); // bad length
        fake.extend_from_slice(&[0u8; 14]); // rest of header
        assert_eq!(fake.len(), FAKE_HEADER_SIZE);

        let valid = valid_bundle_bytes(b"ok");

        let mut stream = fake.clone();
        stream.extend_from_slice(&valid);

        let (items, tail) = scan(&stream);
        assert!(items.iter().any(|i| matches!(i, FramerItem::Discarded(b) if b.len() == 1)));
        assert!(items.iter().any(|i| matches!(i, FramerItem::Bundle(_))));
        assert!(tail.is_empty());
    }

    const FAKE_HEADER_SIZE: usize = 40;

    #[test]
    fn trailing_partial_magic_is_preserved_as_tail() {
        let mut stream = b"leading garbage".to_vec();
        stream.extend_from_slice(&BUNDLE_MAGIC_A[..5]);

        let (items, tail) = scan(&stream);
        assert_eq!(items, vec![FramerItem::Discarded(Bytes::from_static(b"leading garbage"))]);
        assert_eq!(tail.as_ref(), &BUNDLE_MAGIC_A[..5]);
    }

    #[test]
    fn incomplete_bundle_after_magic_is_preserved_as_tail() {
        let mut stream = BUNDLE_MAGIC_A.to_vec();
        stream.extend_from_slice(&[0u8; 10]); // shorter than header

        let (items, tail) = scan(&stream);
        assert!(items.is_empty());
        assert_eq!(tail.as_ref(), stream.as_slice());
    }
}
