//! Proxy-level error types: everything that can go wrong outside a single
//! session's own I/O, which is handled inline by the relay (§7: I/O errors
//! terminate the affected session only and are never surfaced here).

use thiserror::Error;

/// Errors fatal to the process (startup) or to one external operation
/// (shutdown redirect removal, which is reported but doesn't affect
/// already-closed sessions).
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Failed to load `ANIMLOCK_*` configuration from the environment.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Failed to resolve the bootstrap dialect hostnames.
    #[error("dialect resolution failed: {0}")]
    Dialect(#[from] animlock_core::DialectError),

    /// Installing or removing the iptables redirect rule failed. Fatal at
    /// startup; logged-only at shutdown.
    #[error("iptables redirect failed: {detail}")]
    Redirect {
        /// Description of the failure (process spawn error or non-zero exit).
        detail: String,
    },

    /// Could not bind the listening socket in the configured port range.
    #[error("failed to bind a listening port in [{min}, {max}]")]
    BindExhausted {
        /// Lower bound of the search range.
        min: u16,
        /// Upper bound of the search range.
        max: u16,
    },

    /// Generic I/O failure during startup (not during a session).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
