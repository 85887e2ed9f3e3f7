//! `ActionEffect`: the response payload carrying the animation-lock duration
//! this system exists to rewrite.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{CodecError, Result};

/// Fixed 36-byte `ActionEffect` payload (little-endian).
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct ActionEffect {
    animation_target_actor: [u8; 4],
    unknown_1: [u8; 4],
    action_id: [u8; 4],
    global_effect_counter: [u8; 4],
    animation_lock_duration: [u8; 4],
    unknown_target_id: [u8; 4],
    hide_animation: [u8; 2],
    rotation: [u8; 2],
    action_animation_id: [u8; 2],
    variation: u8,
    effect_display_type: u8,
    unknown_2: [u8; 1],
    effect_count: u8,
    unknown_3: [u8; 2],
}

impl ActionEffect {
    /// Size of the serialized payload.
    pub const SIZE: usize = 36;

    /// Parse from the front of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(bytes)
            .map(|(payload, _)| payload)
            .map_err(|_| CodecError::IncompleteData { needed: Self::SIZE, available: bytes.len() })
    }

    /// Entity ID the effect applies to.
    #[must_use]
    pub fn animation_target_actor(&self) -> u32 {
        u32::from_le_bytes(self.animation_target_actor)
    }

    /// Action being resolved; matched against the request's `action_id`.
    #[must_use]
    pub fn action_id(&self) -> u32 {
        u32::from_le_bytes(self.action_id)
    }

    /// Server's authoritative animation-lock duration, in seconds.
    #[must_use]
    pub fn animation_lock_duration(&self) -> f32 {
        f32::from_le_bytes(self.animation_lock_duration)
    }

    /// Overwrite the animation-lock duration in place.
    pub fn set_animation_lock_duration(&mut self, duration: f32) {
        self.animation_lock_duration = duration.to_le_bytes();
    }
}

impl std::fmt::Debug for ActionEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionEffect")
            .field("animation_target_actor", &self.animation_target_actor())
            .field("action_id", &format_args!("{:#06x}", self.action_id()))
            .field("animation_lock_duration", &self.animation_lock_duration())
            .finish_non_exhaustive()
    }
}

impl PartialEq for ActionEffect {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for ActionEffect {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_thirty_six() {
        assert_eq!(std::mem::size_of::<ActionEffect>(), ActionEffect::SIZE);
    }

    #[test]
    fn mutating_duration_preserves_other_fields() {
        let mut bytes = [0u8; ActionEffect::SIZE];
        bytes[4..8].copy_from_slice(&0x1234u32.to_le_bytes());
        bytes[16..20].copy_from_slice(&0.6f32.to_le_bytes());
        bytes[35] = 0xAB; // last reserved byte, must survive untouched

        let mut effect = *ActionEffect::from_bytes(&bytes).unwrap();
        assert_eq!(effect.action_id(), 0x1234);
        assert!((effect.animation_lock_duration() - 0.6).abs() < f32::EPSILON);

        effect.set_animation_lock_duration(0.475);
        assert!((effect.animation_lock_duration() - 0.475).abs() < f32::EPSILON);
        assert_eq!(effect.as_bytes()[35], 0xAB);
        assert_eq!(effect.action_id(), 0x1234);
    }
}
