//! Error types for the wire codec.
//!
//! Two kinds only, per the framing contract: a structure that is merely
//! short of bytes ([`CodecError::IncompleteData`], recoverable by waiting for
//! more input) and a structure that is internally contradictory
//! ([`CodecError::InvalidData`], recoverable only by resynchronizing past it).

use thiserror::Error;

/// Result alias used throughout the codec.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Decode failure for a fixed-layout structure or a bundle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Buffer shorter than the structure requires. The caller should retain
    /// the bytes seen so far and retry once more data has arrived.
    #[error("incomplete data: need {needed} bytes, have {available}")]
    IncompleteData {
        /// Bytes required to complete the structure.
        needed: usize,
        /// Bytes actually available.
        available: usize,
    },

    /// Structural contradiction: bad magic, an over-long `length`, or a
    /// corrupt zlib stream. Not recoverable for this frame; the caller
    /// resynchronizes past it.
    #[error("invalid data: {0}")]
    InvalidData(&'static str),
}

impl CodecError {
    /// Whether more bytes might resolve this error on a future call.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::IncompleteData { .. })
    }
}
