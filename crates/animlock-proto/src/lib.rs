//! Binary codec for the game's nested wire format: bundle → message → IPC
//! envelope → typed payload.
//!
//! Every fixed-layout structure here round-trips bit-exact unless a caller
//! explicitly mutates a field; "reserved"/"unknown" byte runs are opaque and
//! are always re-emitted verbatim.

pub mod bundle;
pub mod errors;
pub mod framer;
pub mod ipc;
pub mod message;
pub mod payloads;

pub use bundle::{BUNDLE_MAGIC_A, BUNDLE_MAGIC_B, BUNDLE_MAX_LENGTH, Bundle, BundleHeader};
pub use errors::CodecError;
pub use framer::FramerItem;
pub use ipc::{IPC_TYPE_INTERESTED, IpcEnvelope, IpcHeader};
pub use message::{SEGMENT_TYPE_IPC, Message, MessageHeader};
