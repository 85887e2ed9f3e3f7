//! Opcode dialect table: maps a destination IP to the subtype-opcode set
//! used by that datacenter region.

use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};

use ipnet::Ipv4Net;
use thiserror::Error;

/// INTL lobby hostnames, resolved once at startup.
pub const INTL_HOSTNAMES: [&str; 8] = [
    "neolobby01.ffxiv.com",
    "neolobby02.ffxiv.com",
    "neolobby03.ffxiv.com",
    "neolobby04.ffxiv.com",
    "neolobby05.ffxiv.com",
    "neolobby06.ffxiv.com",
    "neolobby07.ffxiv.com",
    "neolobby08.ffxiv.com",
];

/// KR lobby hostname, resolved once at startup.
pub const KR_HOSTNAME: &str = "lobbyf-live.ff14.co.kr";

/// A region's fixed subtype-opcode mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    /// Client → server: the player issued an action.
    pub request_action: u16,
    /// Server → client: a cast bar started.
    pub response_actor_cast: u16,
    /// Server → client: a general actor state-change notification.
    pub response_actor_control: u16,
    /// Server → client: a self-targeted state-change notification.
    pub response_actor_control_self: u16,
    /// Server → client: the action resolved. Several subtypes are used
    /// interchangeably by the server for this, hence the set.
    pub response_action_result: &'static [u16],
}

impl Dialect {
    /// Whether `subtype` is one of this dialect's action-result codes.
    #[must_use]
    pub fn is_action_result(&self, subtype: u16) -> bool {
        self.response_action_result.contains(&subtype)
    }
}

/// International datacenter dialect.
pub const INTL: Dialect = Dialect {
    request_action: 0x017a,
    response_actor_cast: 0x02b2,
    response_actor_control: 0x00f0,
    response_actor_control_self: 0x017a,
    response_action_result: &[0x021f, 0x03df, 0x00ad, 0x0229, 0x0197],
};

/// Korean datacenter dialect.
pub const KR: Dialect = Dialect {
    request_action: 0x00f0,
    response_actor_cast: 0x03b8,
    response_actor_control: 0x013d,
    response_actor_control_self: 0x025f,
    response_action_result: &[0x0266, 0x0167, 0x03a7, 0x016b, 0x0231],
};

/// Which dialect (if any) a destination address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// International datacenter; use [`INTL`].
    Intl,
    /// Korean datacenter; use [`KR`].
    Kr,
    /// Destination outside both network sets; treat as an opaque byte pipe.
    NonGame,
}

/// Failure resolving the bootstrap hostnames.
#[derive(Error, Debug)]
pub enum DialectError {
    /// DNS resolution failed for a bootstrap hostname.
    #[error("failed to resolve {hostname}: {source}")]
    Resolve {
        /// Hostname that failed to resolve.
        hostname: &'static str,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A hostname resolved but produced no IPv4 address.
    #[error("{hostname} resolved to no IPv4 address")]
    NoIpv4Address {
        /// Hostname that produced no usable address.
        hostname: &'static str,
    },
}

/// Immutable, process-wide table classifying destinations into regions.
///
/// Resolved once at startup from DNS and never mutated afterward.
#[derive(Debug, Clone)]
pub struct DialectTable {
    intl_networks: Vec<Ipv4Net>,
    kr_networks: Vec<Ipv4Net>,
}

fn resolve_ipv4(hostname: &'static str) -> Result<Ipv4Addr, DialectError> {
    let addrs: Vec<SocketAddr> = (hostname, 0)
        .to_socket_addrs()
        .map_err(|source| DialectError::Resolve { hostname, source })?
        .collect();

    addrs
        .into_iter()
        .find_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(*v4.ip()),
            SocketAddr::V6(_) => None,
        })
        .ok_or(DialectError::NoIpv4Address { hostname })
}

fn containing_slash_24(addr: Ipv4Addr) -> Ipv4Net {
    Ipv4Net::new(addr, 24)
        .unwrap_or_else(|_| unreachable!("prefix length 24 is always valid for IPv4"))
        .trunc()
}

impl DialectTable {
    /// Resolve the bootstrap hostnames and build the table.
    ///
    /// # Errors
    ///
    /// [`DialectError`] if any bootstrap hostname fails to resolve.
    pub fn resolve() -> Result<Self, DialectError> {
        let mut intl_networks = Vec::with_capacity(INTL_HOSTNAMES.len());
        for hostname in INTL_HOSTNAMES {
            let addr = resolve_ipv4(hostname)?;
            intl_networks.push(containing_slash_24(addr));
            tracing::debug!(hostname, %addr, "resolved INTL bootstrap hostname");
        }

        let kr_addr = resolve_ipv4(KR_HOSTNAME)?;
        let kr_networks = vec![containing_slash_24(kr_addr)];
        tracing::debug!(hostname = KR_HOSTNAME, %kr_addr, "resolved KR bootstrap hostname");

        Ok(Self { intl_networks, kr_networks })
    }

    /// Build a table directly from networks, bypassing DNS. Used in tests
    /// and when `ANIMLOCK_SKIP_REDIRECT`-style local development needs a
    /// known-good table without a live resolver.
    #[must_use]
    pub fn from_networks(intl_networks: Vec<Ipv4Net>, kr_networks: Vec<Ipv4Net>) -> Self {
        Self { intl_networks, kr_networks }
    }

    /// Union of every network this table recognizes as game traffic, used to
    /// build the redirect rule that spans both regions.
    #[must_use]
    pub fn all_networks(&self) -> Vec<Ipv4Net> {
        self.intl_networks.iter().chain(&self.kr_networks).copied().collect()
    }

    /// Classify a destination address by first-match membership: INTL, then
    /// KR, otherwise non-game.
    #[must_use]
    pub fn classify(&self, addr: Ipv4Addr) -> Region {
        if self.intl_networks.iter().any(|net| net.contains(&addr)) {
            Region::Intl
        } else if self.kr_networks.iter().any(|net| net.contains(&addr)) {
            Region::Kr
        } else {
            Region::NonGame
        }
    }

    /// The dialect for a classified region, if any.
    #[must_use]
    pub fn dialect_for(region: Region) -> Option<Dialect> {
        match region {
            Region::Intl => Some(INTL),
            Region::Kr => Some(KR),
            Region::NonGame => None,
        }
    }
}
