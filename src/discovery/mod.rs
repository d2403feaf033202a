//! Endpoint discovery.
//!
//! Resolves how a client reaches the POS server, trying strategies in
//! priority order and short-circuiting on the first success:
//!
//! 1. Tunnel health check (when a tunnel is configured and enabled)
//! 2. mDNS service lookup, verified by a reachability probe
//! 3. Last-known-IP retry
//! 4. Common-address heuristics (router-like `.1`/`.100`/`.254`, and the
//!    host-gateway special case for the emulator loopback NAT)
//! 5. Parallel subnet scan
//!
//! Every probe carries its own timeout, and the whole chain runs under a
//! global budget so a buggy or overly generous inner timeout cannot hang
//! the caller.

pub mod mdns;
pub mod probe;
pub mod scan;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::error::DiscoveryError;
use crate::models::ClientRole;
use probe::Prober;

/// Global discovery budget; every nested strategy budget is strictly smaller.
pub const GLOBAL_TIMEOUT: Duration = Duration::from_secs(15);

/// Budget for the tunnel health check.
const TUNNEL_TIMEOUT: Duration = Duration::from_secs(5);

/// Budget for the mDNS broadcast lookup.
const MDNS_TIMEOUT: Duration = Duration::from_secs(3);

/// Budget for the parallel subnet scan.
const SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Default POS server port for local (non-tunnel) connections. Tunnel hosts
/// carry no explicit port; the tunnel's own routing resolves it.
pub const DEFAULT_PORT: u16 = 8080;

/// How the client currently reaches the POS server.
///
/// Immutable once established: a new connection attempt produces a new
/// value, never mutates one in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConnection {
    /// Bare `host[:port]` for local connections, or the tunnel host.
    pub address: String,
    pub is_tunnel: bool,
    /// Selects `wss`/`https` over `ws`/`http`.
    pub is_secure: bool,
}

impl ServerConnection {
    /// A plain local-network connection.
    pub fn local(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            is_tunnel: false,
            is_secure: false,
        }
    }

    /// A tunnel connection.
    pub fn tunnel(host: impl Into<String>, secure: bool) -> Self {
        Self {
            address: host.into(),
            is_tunnel: true,
            is_secure: secure,
        }
    }

    fn authority(&self) -> String {
        if self.is_tunnel || self.address.contains(':') {
            self.address.clone()
        } else {
            format!("{}:{DEFAULT_PORT}", self.address)
        }
    }

    /// WebSocket endpoint for the given client role.
    pub fn ws_url(&self, role: ClientRole) -> String {
        let scheme = if self.is_secure { "wss" } else { "ws" };
        format!("{scheme}://{}/ws?type={}", self.authority(), role.as_str())
    }

    /// Base URL for the server's REST API.
    pub fn http_base(&self) -> String {
        let scheme = if self.is_secure { "https" } else { "http" };
        format!("{scheme}://{}", self.authority())
    }
}

/// Tunnel configuration, persisted alongside the rest of the client state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TunnelSettings {
    pub enabled: bool,
    pub url: String,
    pub secure: bool,
}

/// Inputs to a discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub tunnel: Option<TunnelSettings>,
    /// Last successful connection, retried before any scanning.
    pub last_known: Option<ServerConnection>,
    pub port: u16,
    /// Disabled in tests so no real mDNS daemon is started.
    pub mdns_enabled: bool,
    pub global_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            tunnel: None,
            last_known: None,
            port: DEFAULT_PORT,
            mdns_enabled: true,
            global_timeout: GLOBAL_TIMEOUT,
        }
    }
}

/// Runs the discovery chain under the global budget.
///
/// # Errors
///
/// [`DiscoveryError::Timeout`] if the budget elapsed mid-chain, or
/// [`DiscoveryError::NoServerFound`] if every strategy completed empty.
/// Callers surface both with a retry action and a manual-address fallback.
pub async fn discover<P>(
    prober: Arc<P>,
    config: &DiscoveryConfig,
) -> std::result::Result<ServerConnection, DiscoveryError>
where
    P: Prober + 'static,
{
    match tokio::time::timeout(config.global_timeout, run_strategies(prober, config)).await {
        Ok(Some(connection)) => {
            info!(
                address = connection.address,
                is_tunnel = connection.is_tunnel,
                "discovered POS server"
            );
            Ok(connection)
        }
        Ok(None) => Err(DiscoveryError::NoServerFound),
        Err(_) => Err(DiscoveryError::Timeout(config.global_timeout)),
    }
}

async fn run_strategies<P>(prober: Arc<P>, config: &DiscoveryConfig) -> Option<ServerConnection>
where
    P: Prober + 'static,
{
    // 1. Tunnel, when configured and enabled.
    if let Some(tunnel) = &config.tunnel
        && tunnel.enabled
    {
        let host = normalize_tunnel_host(&tunnel.url);
        let scheme = if tunnel.secure { "https" } else { "http" };
        let healthy = tokio::time::timeout(
            TUNNEL_TIMEOUT,
            prober.check_health(&format!("{scheme}://{host}")),
        )
        .await;
        if matches!(healthy, Ok(true)) {
            return Some(ServerConnection::tunnel(host, tunnel.secure));
        }
        debug!(host, "tunnel not reachable, falling back to local discovery");
    }

    // 2a. mDNS lookup, verified before being trusted.
    if config.mdns_enabled
        && let Some((ip, port)) = mdns::lookup(MDNS_TIMEOUT).await
    {
        if prober.probe(&ip, port).await {
            return Some(ServerConnection::local(format!("{ip}:{port}")));
        }
        debug!(ip, port, "mDNS hit did not answer a probe, ignoring");
    }

    // 2b. Last-known address retry.
    if let Some(previous) = &config.last_known
        && !previous.is_tunnel
    {
        let (host, port) = split_host_port(&previous.address, config.port);
        if prober.probe(&host, port).await {
            return Some(previous.clone());
        }
    }

    // 2c. Common-address heuristics.
    if let Some(ip) = local_ip().await {
        for host in common_candidates(&ip) {
            if prober.probe(&host, config.port).await {
                return Some(ServerConnection::local(format!("{host}:{}", config.port)));
            }
        }

        // 2d. Parallel subnet scan, bounded and cancelled on first success.
        if let Some(subnet) = ip.rsplit_once('.').map(|(prefix, _)| prefix.to_string()) {
            let scan = tokio::time::timeout(
                SCAN_TIMEOUT,
                scan::scan_subnet(Arc::clone(&prober), &subnet, config.port),
            )
            .await;
            if let Ok(Some(host)) = scan {
                return Some(ServerConnection::local(format!("{host}:{}", config.port)));
            }
        }
    } else {
        warn!("could not determine local IP, skipping subnet strategies");
    }

    None
}

/// Strips the scheme prefix and any trailing slash from a configured tunnel
/// URL, leaving the bare host.
pub fn normalize_tunnel_host(url: &str) -> String {
    let host = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("wss://")
        .trim_start_matches("ws://");
    host.trim_end_matches('/').to_string()
}

/// Validates a manually entered server address before any probe is issued.
///
/// Accepts `host` or `host:port` where the host is an IPv4 address or a
/// plain hostname and the port, when present, is numeric.
///
/// # Errors
///
/// Returns [`ComandaError::Config`](crate::ComandaError::Config) describing
/// what is wrong with the input.
pub fn validate_manual_address(input: &str) -> crate::Result<ServerConnection> {
    let input = input.trim();
    if input.is_empty() {
        return Err(crate::ComandaError::Config(
            "server address is empty".to_string(),
        ));
    }

    let (host, port) = match input.rsplit_once(':') {
        Some((host, port)) => {
            let port: u16 = port.parse().map_err(|_| {
                crate::ComandaError::Config(format!("invalid port in address {input:?}"))
            })?;
            (host, port)
        }
        None => (input, DEFAULT_PORT),
    };

    let valid_host = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if !valid_host {
        return Err(crate::ComandaError::Config(format!(
            "invalid host in address {input:?}"
        )));
    }

    Ok(ServerConnection::local(format!("{host}:{port}")))
}

/// Splits `host[:port]`, falling back to `default_port`.
fn split_host_port(address: &str, default_port: u16) -> (String, u16) {
    match address.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host.to_string(), port),
            Err(_) => (address.to_string(), default_port),
        },
        None => (address.to_string(), default_port),
    }
}

/// Router-like addresses worth probing before a full scan.
///
/// The `10.0.2.x` prefix is the emulator loopback NAT: the development host
/// is always reachable at `10.0.2.2`, so that is the only candidate there.
fn common_candidates(local_ip: &str) -> Vec<String> {
    let Some((subnet, _)) = local_ip.rsplit_once('.') else {
        return Vec::new();
    };
    if subnet == "10.0.2" {
        return vec!["10.0.2.2".to_string()];
    }
    vec![
        format!("{subnet}.1"),
        format!("{subnet}.100"),
        format!("{subnet}.254"),
    ]
}

/// Determines the local IP by asking the routing table which source address
/// would reach a public host. No packets are sent.
async fn local_ip() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").await.ok()?;
    socket.connect("8.8.8.8:80").await.ok()?;
    Some(socket.local_addr().ok()?.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tunnel_host_normalization_strips_schemes() {
        assert_eq!(
            normalize_tunnel_host("https://pos.example.com/"),
            "pos.example.com"
        );
        assert_eq!(normalize_tunnel_host("wss://pos.example.com"), "pos.example.com");
        assert_eq!(normalize_tunnel_host("pos.example.com"), "pos.example.com");
    }

    #[test]
    fn manual_address_accepts_bare_host_and_host_port() {
        let conn = validate_manual_address("192.168.1.50").unwrap();
        assert_eq!(conn.address, "192.168.1.50:8080");
        let conn = validate_manual_address("pos-server:9090").unwrap();
        assert_eq!(conn.address, "pos-server:9090");
        assert!(!conn.is_tunnel);
    }

    #[test]
    fn manual_address_rejects_garbage() {
        assert!(validate_manual_address("").is_err());
        assert!(validate_manual_address("192.168.1.50:notaport").is_err());
        assert!(validate_manual_address("bad host!").is_err());
    }

    #[test]
    fn emulator_nat_probes_host_gateway_only() {
        assert_eq!(common_candidates("10.0.2.15"), vec!["10.0.2.2"]);
    }

    #[test]
    fn common_candidates_cover_router_like_hosts() {
        let candidates = common_candidates("192.168.1.37");
        assert_eq!(
            candidates,
            vec!["192.168.1.1", "192.168.1.100", "192.168.1.254"]
        );
    }

    #[test]
    fn ws_url_includes_role_and_default_port() {
        let conn = ServerConnection::local("192.168.1.50");
        assert_eq!(
            conn.ws_url(ClientRole::Kitchen),
            "ws://192.168.1.50:8080/ws?type=kitchen"
        );

        let tunnel = ServerConnection::tunnel("pos.example.com", true);
        assert_eq!(
            tunnel.ws_url(ClientRole::Waiter),
            "wss://pos.example.com/ws?type=waiter"
        );
        assert_eq!(tunnel.http_base(), "https://pos.example.com");
    }
}
