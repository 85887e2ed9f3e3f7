//! Dialect resolution and the per-connection animation-lock tracker.
//!
//! This crate holds no I/O: [`clock::Clock`] abstracts time and randomness so
//! the tracker's policy is fully deterministic under test, and production
//! code supplies [`clock::SystemClock`].

pub mod clock;
pub mod dialect;
pub mod observer;
pub mod tracker;

pub use dialect::{Dialect, DialectError, DialectTable, Region, INTL, KR};
pub use observer::{observe_bundle, Direction};
pub use tracker::{AnimLockTracker, EffectOutcome};
