//! IPC envelope: the payload of a segment-type-3 [`crate::message::Message`].

use bytes::{BufMut, Bytes};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{CodecError, Result};

/// Only IPC type the tracker inspects; other values pass through untouched.
pub const IPC_TYPE_INTERESTED: u16 = 0x14;

/// Fixed 16-byte IPC envelope header (little-endian).
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct IpcHeader {
    ipc_type: [u8; 2],
    subtype: [u8; 2],
    unknown1: [u8; 2],
    server_id: [u8; 2],
    epoch: [u8; 4],
    unknown2: [u8; 4],
}

impl IpcHeader {
    /// Size of the serialized header.
    pub const SIZE: usize = 16;

    /// Parse a header from the front of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(bytes)
            .map(|(header, _)| header)
            .map_err(|_| CodecError::IncompleteData { needed: Self::SIZE, available: bytes.len() })
    }

    /// IPC type; only [`IPC_TYPE_INTERESTED`] is of interest.
    #[must_use]
    pub fn ipc_type(&self) -> u16 {
        u16::from_le_bytes(self.ipc_type)
    }

    /// Dialect-resolved event code.
    #[must_use]
    pub fn subtype(&self) -> u16 {
        u16::from_le_bytes(self.subtype)
    }

    /// Passed through untouched on re-encode.
    #[must_use]
    pub fn server_id(&self) -> u16 {
        u16::from_le_bytes(self.server_id)
    }

    /// Passed through untouched on re-encode.
    #[must_use]
    pub fn epoch(&self) -> u32 {
        u32::from_le_bytes(self.epoch)
    }

    /// Reserved span following `subtype`, opaque and re-emitted verbatim on
    /// encode.
    #[must_use]
    pub fn unknown1(&self) -> [u8; 2] {
        self.unknown1
    }

    /// Reserved span following `epoch`, opaque and re-emitted verbatim on
    /// encode.
    #[must_use]
    pub fn unknown2(&self) -> [u8; 4] {
        self.unknown2
    }
}

impl std::fmt::Debug for IpcHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpcHeader")
            .field("ipc_type", &format_args!("{:#06x}", self.ipc_type()))
            .field("subtype", &format_args!("{:#06x}", self.subtype()))
            .field("server_id", &self.server_id())
            .field("epoch", &self.epoch())
            .finish()
    }
}

impl PartialEq for IpcHeader {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for IpcHeader {}

/// A decoded IPC envelope: a `(type, subtype)` tag over an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpcEnvelope {
    /// IPC type; only [`IPC_TYPE_INTERESTED`] is of interest.
    pub ipc_type: u16,
    /// Dialect-resolved event code.
    pub subtype: u16,
    /// Passed through untouched on re-encode.
    pub server_id: u16,
    /// Passed through untouched on re-encode.
    pub epoch: u32,
    /// Reserved, opaque; re-emitted verbatim on encode.
    pub unknown1: [u8; 2],
    /// Reserved, opaque; re-emitted verbatim on encode.
    pub unknown2: [u8; 4],
    /// Typed payload bytes, not yet interpreted.
    pub data: Bytes,
}

impl IpcEnvelope {
    /// Decode an IPC envelope that occupies the entirety of `bytes`.
    ///
    /// # Errors
    ///
    /// [`CodecError::IncompleteData`] if `bytes` is shorter than the header.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = IpcHeader::from_bytes(bytes)?;
        Ok(Self {
            ipc_type: header.ipc_type(),
            subtype: header.subtype(),
            server_id: header.server_id(),
            epoch: header.epoch(),
            unknown1: header.unknown1(),
            unknown2: header.unknown2(),
            data: Bytes::copy_from_slice(&bytes[IpcHeader::SIZE..]),
        })
    }

    /// Re-encode the envelope.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u16_le(self.ipc_type);
        dst.put_u16_le(self.subtype);
        dst.put_slice(&self.unknown1);
        dst.put_u16_le(self.server_id);
        dst.put_u32_le(self.epoch);
        dst.put_slice(&self.unknown2);
        dst.put_slice(&self.data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let envelope = IpcEnvelope {
            ipc_type: IPC_TYPE_INTERESTED,
            subtype: 0x021f,
            server_id: 7,
            epoch: 99,
            unknown1: [0xAB, 0xCD],
            unknown2: [0x12, 0x34, 0x56, 0x78],
            data: Bytes::from_static(b"typed-payload-bytes"),
        };
        let mut buf = Vec::new();
        envelope.encode(&mut buf);
        let decoded = IpcEnvelope::decode(&buf).expect("decode");
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn rejects_short_buffer() {
        let buf = [0u8; 4];
        let err = IpcEnvelope::decode(&buf).unwrap_err();
        assert!(err.is_incomplete());
    }
}
