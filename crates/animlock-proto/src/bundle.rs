//! Bundle: the outermost on-wire frame.
//!
//! A bundle is magic-prefixed, carries a run of [`crate::message::Message`]s
//! concatenated without padding, and is optionally zlib-compressed. All
//! multi-byte integers are little-endian, matching the client's native byte
//! order.

use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};
use flate2::{Compression, read::ZlibDecoder, write::ZlibEncoder};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{CodecError, Result};

/// Non-zero magic constant used by most bundles.
pub const BUNDLE_MAGIC_A: [u8; 16] = [
    0x52, 0x52, 0xa0, 0x41, 0xff, 0x5d, 0x46, 0xe2, 0x7f, 0x2a, 0x64, 0x4d, 0x7b, 0x99, 0xc4, 0x75,
];

/// All-zero magic constant, used by keep-alive bundles.
pub const BUNDLE_MAGIC_B: [u8; 16] = [0u8; 16];

/// Hard ceiling on a bundle's total on-wire length, header included.
pub const BUNDLE_MAX_LENGTH: u16 = 65535;
const BUNDLE_MAX_LENGTH_USIZE: usize = 65536;

/// Fixed 40-byte bundle header (little-endian).
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct BundleHeader {
    magic: [u8; 16],
    timestamp: [u8; 8],
    length: [u8; 2],
    unknown1: [u8; 2],
    conn_type: [u8; 2],
    message_count: [u8; 2],
    encoding: u8,
    zlib_compressed: u8,
    unknown2: [u8; 6],
}

impl BundleHeader {
    /// Size of the serialized header.
    pub const SIZE: usize = 40;

    /// Parse a header from the front of `bytes`, without validating its
    /// magic (the framer has already located it).
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(bytes)
            .map(|(header, _)| header)
            .map_err(|_| CodecError::IncompleteData { needed: Self::SIZE, available: bytes.len() })
    }

    /// Raw 16-byte magic.
    #[must_use]
    pub fn magic(&self) -> [u8; 16] {
        self.magic
    }

    /// Whether this header uses the non-zero or the all-zero magic.
    #[must_use]
    pub fn has_known_magic(&self) -> bool {
        self.magic == BUNDLE_MAGIC_A || self.magic == BUNDLE_MAGIC_B
    }

    /// Milliseconds since an unspecified epoch, passed through untouched.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        u64::from_le_bytes(self.timestamp)
    }

    /// Total bundle length including this header.
    #[must_use]
    pub fn length(&self) -> u16 {
        u16::from_le_bytes(self.length)
    }

    /// Connection/session type, passed through untouched.
    #[must_use]
    pub fn conn_type(&self) -> u16 {
        u16::from_le_bytes(self.conn_type)
    }

    /// Number of messages concatenated in the payload.
    #[must_use]
    pub fn message_count(&self) -> u16 {
        u16::from_le_bytes(self.message_count)
    }

    /// Opaque encoding byte, passed through untouched.
    #[must_use]
    pub fn encoding(&self) -> u8 {
        self.encoding
    }

    /// Whether the message payload is zlib-compressed.
    #[must_use]
    pub fn zlib_compressed(&self) -> bool {
        self.zlib_compressed != 0
    }

    /// Reserved span between `length` and `conn_type`, opaque and re-emitted
    /// verbatim on encode.
    #[must_use]
    pub fn unknown1(&self) -> [u8; 2] {
        self.unknown1
    }

    /// Reserved span following `zlib_compressed`, opaque and re-emitted
    /// verbatim on encode.
    #[must_use]
    pub fn unknown2(&self) -> [u8; 6] {
        self.unknown2
    }
}

impl std::fmt::Debug for BundleHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleHeader")
            .field("timestamp", &self.timestamp())
            .field("length", &self.length())
            .field("conn_type", &self.conn_type())
            .field("message_count", &self.message_count())
            .field("encoding", &self.encoding())
            .field("zlib_compressed", &self.zlib_compressed())
            .finish_non_exhaustive()
    }
}

impl PartialEq for BundleHeader {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for BundleHeader {}

/// A fully decoded bundle: header metadata plus the decompressed messages
/// blob, ready for the message-level decoder to walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// Passed through untouched on re-encode.
    pub timestamp: u64,
    /// Passed through untouched on re-encode.
    pub conn_type: u16,
    /// Passed through untouched on re-encode.
    pub encoding: u8,
    /// Whether to re-compress `messages` on encode.
    pub zlib_compressed: bool,
    /// Which magic constant to emit on encode.
    pub magic: [u8; 16],
    /// Number of `Message`s concatenated in `messages`.
    pub message_count: u16,
    /// Reserved, opaque; re-emitted verbatim on encode.
    pub unknown1: [u8; 2],
    /// Reserved, opaque; re-emitted verbatim on encode.
    pub unknown2: [u8; 6],
    /// Decompressed, concatenated `Message` bytes.
    pub messages: Bytes,
}

impl Bundle {
    /// Decode a bundle starting at the front of `bytes`.
    ///
    /// `bytes` must begin exactly at a magic constant; the caller (the
    /// framer) is responsible for locating it.
    ///
    /// # Errors
    ///
    /// - [`CodecError::IncompleteData`] if fewer than [`BundleHeader::SIZE`]
    ///   bytes are available, or if the header claims more bytes than are
    ///   present.
    /// - [`CodecError::InvalidData`] if the magic is unrecognized, `length`
    ///   exceeds [`BUNDLE_MAX_LENGTH`], or the zlib stream is corrupt.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize)> {
        if bytes.len() < BundleHeader::SIZE {
            return Err(CodecError::IncompleteData {
                needed: BundleHeader::SIZE,
                available: bytes.len(),
            });
        }

        let header = BundleHeader::from_bytes(bytes)?;
        if !header.has_known_magic() {
            return Err(CodecError::InvalidData("unrecognized bundle magic"));
        }

        let total_len = header.length() as usize;
        if total_len > BUNDLE_MAX_LENGTH_USIZE || total_len < BundleHeader::SIZE {
            return Err(CodecError::InvalidData("bundle length out of range"));
        }

        if bytes.len() < total_len {
            return Err(CodecError::IncompleteData { needed: total_len, available: bytes.len() });
        }

        let payload = &bytes[BundleHeader::SIZE..total_len];
        let messages = if header.zlib_compressed() {
            let mut decoder = ZlibDecoder::new(payload);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|_| CodecError::InvalidData("corrupt zlib stream"))?;
            Bytes::from(out)
        } else {
            Bytes::copy_from_slice(payload)
        };

        let bundle = Self {
            timestamp: header.timestamp(),
            conn_type: header.conn_type(),
            encoding: header.encoding(),
            zlib_compressed: header.zlib_compressed(),
            magic: header.magic(),
            message_count: header.message_count(),
            unknown1: header.unknown1(),
            unknown2: header.unknown2(),
            messages,
        };

        Ok((bundle, total_len))
    }

    /// Re-encode the bundle. `length` is always recomputed from the actual
    /// on-wire size; the decoded value is never trusted on re-emission.
    ///
    /// # Errors
    ///
    /// [`CodecError::InvalidData`] if the recomputed length would exceed
    /// [`BUNDLE_MAX_LENGTH`].
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        let payload: Bytes = if self.zlib_compressed {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder
                .write_all(&self.messages)
                .and_then(|()| encoder.finish())
                .map_err(|_| CodecError::InvalidData("zlib compression failed"))?
                .into()
        } else {
            self.messages.clone()
        };

        let total_len = BundleHeader::SIZE + payload.len();
        if total_len > BUNDLE_MAX_LENGTH_USIZE {
            return Err(CodecError::InvalidData("encoded bundle exceeds maximum length"));
        }

        let mut buf = BytesMut::with_capacity(total_len);
        buf.put_slice(&self.magic);
        buf.put_u64_le(self.timestamp);
        #[allow(clippy::cast_possible_truncation)]
        buf.put_u16_le(total_len as u16);
        buf.put_slice(&self.unknown1);
        buf.put_u16_le(self.conn_type);
        buf.put_u16_le(self.message_count);
        buf.put_u8(self.encoding);
        buf.put_u8(u8::from(self.zlib_compressed));
        buf.put_slice(&self.unknown2);
        buf.put_slice(&payload);

        dst.put_slice(&buf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header_bytes(zlib: bool, length: u16) -> Vec<u8> {
        let mut buf = Vec::with_capacity(BundleHeader::SIZE);
        buf.extend_from_slice(&BUNDLE_MAGIC_A);
        buf.extend_from_slice(&1234u64.to_le_bytes());
        buf.extend_from_slice(&length.to_le_bytes());
        buf.extend_from_slice(&[0u8; 2]);
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.push(0);
        buf.push(u8::from(zlib));
        buf.extend_from_slice(&[0u8; 6]);
        buf
    }

    #[test]
    fn header_size_is_forty() {
        assert_eq!(std::mem::size_of::<BundleHeader>(), BundleHeader::SIZE);
        assert_eq!(BundleHeader::SIZE, 40);
    }

    #[test]
    fn decode_rejects_short_buffer() {
        let buf = [0u8; 10];
        let err = Bundle::decode(&buf).unwrap_err();
        assert!(err.is_incomplete());
    }

    #[test]
    fn decode_rejects_unknown_magic() {
        let mut buf = sample_header_bytes(false, BundleHeader::SIZE as u16);
        buf[0] = 0xAB; // corrupt the magic
        let err = Bundle::decode(&buf).unwrap_err();
        assert!(!err.is_incomplete());
    }

    #[test]
    fn uncompressed_round_trip() {
        let message = b"hello-message-bytes".to_vec();
        let total_len = (BundleHeader::SIZE + message.len()) as u16;
        let mut buf = sample_header_bytes(false, total_len);
        buf.extend_from_slice(&message);

        let (bundle, consumed) = Bundle::decode(&buf).expect("decode");
        assert_eq!(consumed, buf.len());
        assert_eq!(bundle.messages.as_ref(), message.as_slice());

        let mut out = Vec::new();
        bundle.encode(&mut out).expect("encode");
        assert_eq!(out, buf);
    }

    #[test]
    fn compressed_round_trip_recomputes_length() {
        let message = vec![7u8; 512];
        let bundle = Bundle {
            timestamp: 42,
            conn_type: 1,
            encoding: 0,
            zlib_compressed: true,
            magic: BUNDLE_MAGIC_A,
            message_count: 1,
            unknown1: [0u8; 2],
            unknown2: [0u8; 6],
            messages: Bytes::from(message.clone()),
        };

        let mut encoded = Vec::new();
        bundle.encode(&mut encoded).expect("encode");

        let (decoded, consumed) = Bundle::decode(&encoded).expect("decode");
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded.messages.as_ref(), message.as_slice());
    }

    #[test]
    fn decode_rejects_truncated_zlib_stream() {
        let bundle = Bundle {
            timestamp: 0,
            conn_type: 0,
            encoding: 0,
            zlib_compressed: true,
            magic: BUNDLE_MAGIC_A,
            message_count: 0,
            unknown1: [0u8; 2],
            unknown2: [0u8; 6],
            messages: Bytes::from_static(b"some plaintext that will compress"),
        };
        let mut encoded = Vec::new();
        bundle.encode(&mut encoded).expect("encode");
        encoded.truncate(encoded.len() - 4);
        // Correct the length field down so decode reaches the zlib stage.
        #[allow(clippy::cast_possible_truncation)]
        let new_len = (encoded.len() as u16).to_le_bytes();
        encoded[16..18].copy_from_slice(&new_len);

        let err = Bundle::decode(&encoded).unwrap_err();
        assert!(!err.is_incomplete());
    }
}
