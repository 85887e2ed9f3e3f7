//! Process configuration, resolved once at startup from the environment (with
//! an optional `.env` file loaded first) in the style of a 12-factor service.
//! There is no command-line surface: the upstream program takes no flags, and
//! this keeps that constraint while still giving the proxy a config layer.

use serde::Deserialize;

const DEFAULT_LOG: &str = "info";
const DEFAULT_EXTRA_DELAY_SECS: f64 = 0.075;
const DEFAULT_LISTEN_PORT_MIN: u16 = 10_000;
const DEFAULT_LISTEN_PORT_MAX: u16 = 65_535;

fn default_log() -> String {
    DEFAULT_LOG.to_string()
}

fn default_extra_delay_secs() -> f64 {
    DEFAULT_EXTRA_DELAY_SECS
}

fn default_listen_port_min() -> u16 {
    DEFAULT_LISTEN_PORT_MIN
}

fn default_listen_port_max() -> u16 {
    DEFAULT_LISTEN_PORT_MAX
}

/// Environment-sourced configuration. Field names map to `ANIMLOCK_`-prefixed
/// environment variables via `envy`, e.g. `log` reads `ANIMLOCK_LOG`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Tracing filter directive.
    #[serde(default = "default_log")]
    pub log: String,

    /// Override for the safety margin added on top of the server's reported
    /// animation-lock duration. Values at or below the anti-tamper floor
    /// activate the sabotage clamp, by design.
    #[serde(default = "default_extra_delay_secs")]
    pub extra_delay_secs: f64,

    /// Lower bound (inclusive) of the ephemeral listening-port search range.
    #[serde(default = "default_listen_port_min")]
    pub listen_port_min: u16,

    /// Upper bound (inclusive) of the ephemeral listening-port search range.
    #[serde(default = "default_listen_port_max")]
    pub listen_port_max: u16,

    /// When truthy, skip installing/removing the iptables redirect. For local
    /// development and testing without root.
    #[serde(default)]
    pub skip_redirect: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log: default_log(),
            extra_delay_secs: default_extra_delay_secs(),
            listen_port_min: default_listen_port_min(),
            listen_port_max: default_listen_port_max(),
            skip_redirect: false,
        }
    }
}

/// Error loading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `envy` failed to deserialize the `ANIMLOCK_*` variables.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] envy::Error),
}

impl Config {
    /// Load a `.env` file if present (ignoring a missing file), then parse
    /// `ANIMLOCK_*` environment variables into a `Config`.
    pub fn load() -> Result<Self, ConfigError> {
        if dotenvy::dotenv().is_ok() {
            tracing::debug!("loaded .env file");
        }

        envy::prefixed("ANIMLOCK_").from_env::<Config>().map_err(ConfigError::Invalid)
    }
}
