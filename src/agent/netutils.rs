//! Real-IP interface enumeration, grounded on
//! `original_source/internal/agent/http/client.go`'s `withRealIP`: walk the
//! host's interface addresses and report the first non-loopback IPv4
//! address found.

use std::net::IpAddr;

/// Returns the first non-loopback IPv4 address among the host's network
/// interfaces, or `None` if enumeration fails or none qualifies.
pub fn local_real_ip() -> Option<String> {
    let interfaces = if_addrs::get_if_addrs()
        .map_err(|e| tracing::warn!(error = %e, "failed to enumerate network interfaces"))
        .ok()?;

    interfaces
        .into_iter()
        .filter(|iface| !iface.is_loopback())
        .find_map(|iface| match iface.ip() {
            IpAddr::V4(addr) => Some(addr.to_string()),
            IpAddr::V6(_) => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_real_ip_does_not_panic() {
        // Environment-dependent; only assert this never panics and, when
        // it does return something, that it parses as an IPv4 address.
        if let Some(ip) = local_real_ip() {
            assert!(ip.parse::<std::net::Ipv4Addr>().is_ok());
        }
    }
}
