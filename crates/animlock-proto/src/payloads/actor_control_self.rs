//! `ActorControlSelf`: a self-targeted state-change notification. Only
//! `category == CATEGORY_ROLLBACK` is of interest to the tracker.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{CodecError, Result};

/// `category` value meaning "the previous action was rolled back server-side."
pub const CATEGORY_ROLLBACK: u16 = 0x02bc;

/// Fixed 32-byte `ActorControlSelf` payload (little-endian).
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct ActorControlSelf {
    category: [u8; 2],
    unknown_1: [u8; 2],
    param_1: [u8; 4],
    param_2: [u8; 4],
    param_3: [u8; 4],
    param_4: [u8; 4],
    param_5: [u8; 4],
    param_6: [u8; 4],
    unknown_2: [u8; 4],
}

impl ActorControlSelf {
    /// Size of the serialized payload.
    pub const SIZE: usize = 32;

    /// Parse from the front of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(bytes)
            .map(|(payload, _)| payload)
            .map_err(|_| CodecError::IncompleteData { needed: Self::SIZE, available: bytes.len() })
    }

    /// Event category; compare against [`CATEGORY_ROLLBACK`].
    #[must_use]
    pub fn category(&self) -> u16 {
        u16::from_le_bytes(self.category)
    }
}

impl std::fmt::Debug for ActorControlSelf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorControlSelf")
            .field("category", &format_args!("{:#06x}", self.category()))
            .finish_non_exhaustive()
    }
}

impl PartialEq for ActorControlSelf {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for ActorControlSelf {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_thirty_two() {
        assert_eq!(std::mem::size_of::<ActorControlSelf>(), ActorControlSelf::SIZE);
    }

    #[test]
    fn reads_category() {
        let mut bytes = [0u8; ActorControlSelf::SIZE];
        bytes[0..2].copy_from_slice(&CATEGORY_ROLLBACK.to_le_bytes());
        let control = ActorControlSelf::from_bytes(&bytes).unwrap();
        assert_eq!(control.category(), CATEGORY_ROLLBACK);
    }
}
