//! Message: the second-level frame carried inside a bundle's payload.

use bytes::{BufMut, Bytes};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{CodecError, Result};

/// Only segment type that is decoded further; all others pass through.
pub const SEGMENT_TYPE_IPC: u16 = 3;

/// Fixed 16-byte message header (little-endian).
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct MessageHeader {
    length: [u8; 4],
    source_actor: [u8; 4],
    target_actor: [u8; 4],
    segment_type: [u8; 2],
    unknown1: [u8; 2],
}

impl MessageHeader {
    /// Size of the serialized header.
    pub const SIZE: usize = 16;

    /// Parse a header from the front of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(bytes)
            .map(|(header, _)| header)
            .map_err(|_| CodecError::IncompleteData { needed: Self::SIZE, available: bytes.len() })
    }

    /// Total message length including this header.
    #[must_use]
    pub fn length(&self) -> u32 {
        u32::from_le_bytes(self.length)
    }

    /// Entity ID the message originates from.
    #[must_use]
    pub fn source_actor(&self) -> u32 {
        u32::from_le_bytes(self.source_actor)
    }

    /// Entity ID the message is addressed to.
    #[must_use]
    pub fn target_actor(&self) -> u32 {
        u32::from_le_bytes(self.target_actor)
    }

    /// Segment type; only [`SEGMENT_TYPE_IPC`] is decoded further.
    #[must_use]
    pub fn segment_type(&self) -> u16 {
        u16::from_le_bytes(self.segment_type)
    }

    /// Reserved span following `segment_type`, opaque and re-emitted verbatim
    /// on encode.
    #[must_use]
    pub fn unknown1(&self) -> [u8; 2] {
        self.unknown1
    }
}

impl std::fmt::Debug for MessageHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageHeader")
            .field("length", &self.length())
            .field("source_actor", &self.source_actor())
            .field("target_actor", &self.target_actor())
            .field("segment_type", &self.segment_type())
            .finish()
    }
}

impl PartialEq for MessageHeader {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for MessageHeader {}

/// A single decoded message from a bundle's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Entity ID the message originates from.
    pub source_actor: u32,
    /// Entity ID the message is addressed to.
    pub target_actor: u32,
    /// Segment type; only [`SEGMENT_TYPE_IPC`] is decoded further.
    pub segment_type: u16,
    /// Reserved, opaque; re-emitted verbatim on encode.
    pub unknown1: [u8; 2],
    /// Opaque payload, `length - MessageHeader::SIZE` bytes.
    pub data: Bytes,
}

impl Message {
    /// Decode a message from the front of `bytes`.
    ///
    /// # Errors
    ///
    /// - [`CodecError::IncompleteData`] if fewer bytes than `length` declares
    ///   are available.
    /// - [`CodecError::InvalidData`] if `length` is shorter than the header
    ///   itself, or would overrun `max_len` (the parent bundle's remaining
    ///   payload).
    pub fn decode(bytes: &[u8], max_len: usize) -> Result<(Self, usize)> {
        if bytes.len() < MessageHeader::SIZE {
            return Err(CodecError::IncompleteData {
                needed: MessageHeader::SIZE,
                available: bytes.len(),
            });
        }

        let header = MessageHeader::from_bytes(bytes)?;
        let total_len = header.length() as usize;

        if total_len < MessageHeader::SIZE {
            return Err(CodecError::InvalidData("message length shorter than header"));
        }
        if total_len > max_len {
            return Err(CodecError::InvalidData("message overruns parent bundle"));
        }
        if bytes.len() < total_len {
            return Err(CodecError::IncompleteData { needed: total_len, available: bytes.len() });
        }

        let message = Self {
            source_actor: header.source_actor(),
            target_actor: header.target_actor(),
            segment_type: header.segment_type(),
            unknown1: header.unknown1(),
            data: Bytes::copy_from_slice(&bytes[MessageHeader::SIZE..total_len]),
        };

        Ok((message, total_len))
    }

    /// Re-encode the message; `length` is recomputed from `data.len()`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        let total_len = MessageHeader::SIZE + self.data.len();
        #[allow(clippy::cast_possible_truncation)]
        dst.put_u32_le(total_len as u32);
        dst.put_u32_le(self.source_actor);
        dst.put_u32_le(self.target_actor);
        dst.put_u16_le(self.segment_type);
        dst.put_slice(&self.unknown1);
        dst.put_slice(&self.data);
    }
}
