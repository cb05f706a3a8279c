use std::net::{IpAddr, SocketAddr, UdpSocket};

const DISCOVERY_TARGET_IP: &str = "8.8.8.8";
const DISCOVERY_TARGET_PORT: u16 = 80;
const ANY_ADDR: &str = "0.0.0.0:0";

/// Discover the primary LAN IPv4 address using a temporary UDP socket.
///
/// `connect` on UDP only selects a route; no packet is sent. Returns `None`
/// when the host has no non-loopback IPv4 route.
pub fn discover_local_ipv4() -> Option<IpAddr> {
    let probe = UdpSocket::bind(ANY_ADDR).ok()?;
    probe
        .connect((DISCOVERY_TARGET_IP, DISCOVERY_TARGET_PORT))
        .ok()?;
    let local_ip = probe.local_addr().ok()?.ip();

    (local_ip.is_ipv4() && !local_ip.is_loopback() && !local_ip.is_unspecified())
        .then_some(local_ip)
}

/// URLs a client can use to reach a listener bound to `bound`.
///
/// A wildcard bind (`0.0.0.0`) is advertised as `localhost` plus the LAN
/// address, when one is known; a concrete bind is advertised as-is.
pub fn advertised_urls(scheme: &str, bound: SocketAddr, lan_ip: Option<IpAddr>) -> Vec<String> {
    let port = bound.port();
    if !bound.ip().is_unspecified() {
        return vec![format!("{scheme}://{bound}")];
    }

    let mut urls = vec![format!("{scheme}://localhost:{port}")];
    if let Some(ip) = lan_ip {
        urls.push(format!("{scheme}://{}", SocketAddr::new(ip, port)));
    }
    urls
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn wildcard_bind_advertises_localhost_and_lan() {
        let bound: SocketAddr = "0.0.0.0:3000".parse().unwrap();
        let lan: IpAddr = "192.168.1.20".parse().unwrap();

        assert_eq!(
            advertised_urls("wss", bound, Some(lan)),
            vec!["wss://localhost:3000", "wss://192.168.1.20:3000"]
        );
        assert_eq!(
            advertised_urls("ws", bound, None),
            vec!["ws://localhost:3000"]
        );
    }

    #[test]
    fn concrete_bind_is_advertised_verbatim() {
        let bound: SocketAddr = "127.0.0.1:4100".parse().unwrap();
        assert_eq!(
            advertised_urls("ws", bound, Some("10.0.0.2".parse().unwrap())),
            vec!["ws://127.0.0.1:4100"]
        );
    }

    #[test]
    fn discovered_address_is_never_loopback() {
        if let Some(ip) = discover_local_ipv4() {
            assert!(ip.is_ipv4());
            assert!(!ip.is_loopback());
        }
    }
}
