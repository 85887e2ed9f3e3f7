//! Transparent animation-lock mitigation proxy.
//!
//! Ties together [`animlock_core`]'s dialect table and tracker with real
//! sockets: an [`acceptor`] that classifies and spawns sessions, a [`relay`]
//! that pumps bytes through the framer and tracker in both directions, and
//! the [`redirect`]/[`original_dst`] glue to the host's NAT layer.

pub mod acceptor;
pub mod config;
pub mod error;
pub mod original_dst;
pub mod redirect;
pub mod registry;
pub mod relay;

pub use config::Config;
pub use error::ProxyError;
pub use registry::SessionRegistry;
