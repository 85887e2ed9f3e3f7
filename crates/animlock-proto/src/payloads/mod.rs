//! Typed payloads carried inside an [`crate::ipc::IpcEnvelope`].
//!
//! Each is a fixed-layout little-endian structure. Selection between them is
//! by dialect-resolved subtype, not by type tag on the wire — see
//! `animlock-core`'s dialect table.

mod action_effect;
mod actor_cast;
mod actor_control;
mod actor_control_self;

pub use action_effect::ActionEffect;
pub use actor_cast::ActorCast;
pub use actor_control::{ActorControl, CATEGORY_CANCEL_CAST};
pub use actor_control_self::{ActorControlSelf, CATEGORY_ROLLBACK};
