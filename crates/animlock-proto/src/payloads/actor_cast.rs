//! `ActorCast`: a cast-bar notification. Its presence on the wire pins the
//! head of the tracker's pending queue to the cast sentinel.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{CodecError, Result};

/// Fixed 32-byte `ActorCast` payload (little-endian).
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct ActorCast {
    action_id: [u8; 2],
    skill_type: u8,
    unknown_1: [u8; 1],
    action_id_2: [u8; 2],
    unknown_2: [u8; 2],
    cast_time: [u8; 4],
    target_id: [u8; 4],
    rotation: [u8; 4],
    unknown_3: [u8; 4],
    x: [u8; 2],
    y: [u8; 2],
    z: [u8; 2],
    unknown_4: [u8; 2],
}

impl ActorCast {
    /// Size of the serialized payload.
    pub const SIZE: usize = 32;

    /// Parse from the front of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(bytes)
            .map(|(payload, _)| payload)
            .map_err(|_| CodecError::IncompleteData { needed: Self::SIZE, available: bytes.len() })
    }

    /// Action being cast; correlated against the tracker's pending queue.
    #[must_use]
    pub fn action_id(&self) -> u16 {
        u16::from_le_bytes(self.action_id)
    }

    /// Cast bar duration, in seconds.
    #[must_use]
    pub fn cast_time(&self) -> f32 {
        f32::from_le_bytes(self.cast_time)
    }
}

impl std::fmt::Debug for ActorCast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorCast")
            .field("action_id", &format_args!("{:#06x}", self.action_id()))
            .field("cast_time", &self.cast_time())
            .finish_non_exhaustive()
    }
}

impl PartialEq for ActorCast {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for ActorCast {}
