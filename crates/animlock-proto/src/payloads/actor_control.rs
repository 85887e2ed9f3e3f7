//! `ActorControl`: a general-purpose actor state-change notification. Only
//! `category == CATEGORY_CANCEL_CAST` is of interest to the tracker.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{CodecError, Result};

/// `category` value meaning "the player's cast was cancelled."
pub const CATEGORY_CANCEL_CAST: u16 = 0x000f;

/// Fixed 24-byte `ActorControl` payload (little-endian).
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct ActorControl {
    category: [u8; 2],
    unknown_1: [u8; 2],
    param_1: [u8; 4],
    param_2: [u8; 4],
    param_3: [u8; 4],
    param_4: [u8; 4],
    unknown_2: [u8; 4],
}

impl ActorControl {
    /// Size of the serialized payload.
    pub const SIZE: usize = 24;

    /// Parse from the front of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(bytes)
            .map(|(payload, _)| payload)
            .map_err(|_| CodecError::IncompleteData { needed: Self::SIZE, available: bytes.len() })
    }

    /// Event category; compare against [`CATEGORY_CANCEL_CAST`].
    #[must_use]
    pub fn category(&self) -> u16 {
        u16::from_le_bytes(self.category)
    }
}

impl std::fmt::Debug for ActorControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorControl")
            .field("category", &format_args!("{:#06x}", self.category()))
            .finish_non_exhaustive()
    }
}

impl PartialEq for ActorControl {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for ActorControl {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_twenty_four() {
        assert_eq!(std::mem::size_of::<ActorControl>(), ActorControl::SIZE);
    }

    #[test]
    fn reads_category() {
        let mut bytes = [0u8; ActorControl::SIZE];
        bytes[0..2].copy_from_slice(&CATEGORY_CANCEL_CAST.to_le_bytes());
        let control = ActorControl::from_bytes(&bytes).unwrap();
        assert_eq!(control.category(), CATEGORY_CANCEL_CAST);
    }
}
