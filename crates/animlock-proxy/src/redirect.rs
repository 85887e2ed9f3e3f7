//! Installs and removes the iptables NAT rule that steers game traffic into
//! the proxy's listening port, and enables IPv4 forwarding. Interface-only
//! per the system's scope: this shells out to the host's `iptables` binary
//! rather than reimplementing netfilter rule management.

use ipnet::Ipv4Net;

use crate::error::ProxyError;

/// Install the PREROUTING REDIRECT rule spanning `networks`, pointed at
/// `port`, then enable `net.ipv4.ip_forward`.
///
/// # Errors
///
/// [`ProxyError::Redirect`] if the `iptables` invocation exits non-zero
/// (typically because the process isn't running as root).
pub fn install(networks: &[Ipv4Net], port: u16) -> Result<(), ProxyError> {
    run_iptables(&["-I", "PREROUTING"], networks, "--to-port", port)
}

/// Remove the PREROUTING REDIRECT rule installed by [`install`].
///
/// Uses the same `--to-port` form as [`install`] when specifying the port,
/// since the two rules must match exactly for `-D` to find the one `-I`
/// inserted.
///
/// # Errors
///
/// [`ProxyError::Redirect`] if the `iptables` invocation exits non-zero.
pub fn remove(networks: &[Ipv4Net], port: u16) -> Result<(), ProxyError> {
    run_iptables(&["-D", "PREROUTING"], networks, "--to-port", port)
}

fn run_iptables(
    action: &[&str],
    networks: &[Ipv4Net],
    to_flag: &str,
    port: u16,
) -> Result<(), ProxyError> {
    let destinations = networks.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");

    let status = std::process::Command::new("iptables")
        .arg("-t")
        .arg("nat")
        .args(action)
        .arg("-d")
        .arg(&destinations)
        .arg("-p")
        .arg("tcp")
        .arg("-j")
        .arg("REDIRECT")
        .arg(to_flag)
        .arg(port.to_string())
        .status()
        .map_err(|source| ProxyError::Redirect { detail: source.to_string() })?;

    if !status.success() {
        return Err(ProxyError::Redirect {
            detail: format!("iptables exited with {status}"),
        });
    }

    Ok(())
}

/// Enable IPv4 forwarding via `sysctl`. Failure here is logged but not fatal:
/// the redirect rule alone is enough on hosts where forwarding is already on.
pub fn enable_ipv4_forwarding() {
    match std::process::Command::new("sysctl")
        .arg("-w")
        .arg("net.ipv4.ip_forward=1")
        .status()
    {
        Ok(status) if status.success() => {},
        Ok(status) => tracing::warn!(%status, "sysctl ip_forward exited non-zero"),
        Err(err) => tracing::warn!(%err, "failed to invoke sysctl"),
    }
}
