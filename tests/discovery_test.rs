//! Discovery tests: strategy priority, bounded scan concurrency, and the
//! timeout/not-found distinction, all against a fake prober so no real
//! network is touched.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use comanda::DiscoveryError;
use comanda::discovery::probe::Prober;
use comanda::discovery::scan::{MAX_IN_FLIGHT, scan_subnet};
use comanda::discovery::{DiscoveryConfig, ServerConnection, TunnelSettings, discover};

/// A prober with scripted answers and call accounting.
#[derive(Default)]
struct FakeProber {
    healthy: bool,
    /// The one host that answers TCP probes, if any.
    reachable: Option<String>,
    probe_delay: Duration,
    health_calls: AtomicUsize,
    probe_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Prober for FakeProber {
    async fn check_health(&self, _base_url: &str) -> bool {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        self.healthy
    }

    async fn probe(&self, host: &str, _port: u16) -> bool {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.probe_delay.is_zero() {
            tokio::time::sleep(self.probe_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.reachable.as_deref() == Some(host)
    }
}

fn tunnel_config(enabled: bool) -> DiscoveryConfig {
    DiscoveryConfig {
        tunnel: Some(TunnelSettings {
            enabled,
            url: "https://pos.example.com".to_string(),
            secure: true,
        }),
        mdns_enabled: false,
        ..DiscoveryConfig::default()
    }
}

#[tokio::test]
async fn healthy_tunnel_wins_without_local_probing() {
    let prober = Arc::new(FakeProber {
        healthy: true,
        ..FakeProber::default()
    });
    let config = tunnel_config(true);

    let connection = discover(Arc::clone(&prober), &config).await.unwrap();
    assert_eq!(connection, ServerConnection::tunnel("pos.example.com", true));

    assert_eq!(prober.health_calls.load(Ordering::SeqCst), 1);
    // The local-discovery path must not have been touched.
    assert_eq!(prober.probe_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn last_known_address_is_retried_before_scanning() {
    let prober = Arc::new(FakeProber {
        reachable: Some("192.168.9.9".to_string()),
        ..FakeProber::default()
    });
    let config = DiscoveryConfig {
        last_known: Some(ServerConnection::local("192.168.9.9:8080")),
        mdns_enabled: false,
        ..DiscoveryConfig::default()
    };

    let connection = discover(Arc::clone(&prober), &config).await.unwrap();
    assert_eq!(connection.address, "192.168.9.9:8080");
    assert!(!connection.is_tunnel);
    assert_eq!(prober.probe_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn disabled_tunnel_is_not_probed() {
    let prober = Arc::new(FakeProber {
        healthy: true,
        reachable: Some("192.168.9.9".to_string()),
        ..FakeProber::default()
    });
    let mut config = tunnel_config(false);
    config.last_known = Some(ServerConnection::local("192.168.9.9:8080"));

    let connection = discover(Arc::clone(&prober), &config).await.unwrap();
    assert!(!connection.is_tunnel);
    assert_eq!(prober.health_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn nothing_reachable_reports_no_server_found() {
    let prober = Arc::new(FakeProber::default());
    let config = DiscoveryConfig {
        mdns_enabled: false,
        ..DiscoveryConfig::default()
    };

    let err = discover(prober, &config).await.unwrap_err();
    assert_eq!(err, DiscoveryError::NoServerFound);
}

#[tokio::test]
async fn hung_probes_hit_the_global_timeout() {
    let prober = Arc::new(FakeProber {
        probe_delay: Duration::from_secs(60),
        ..FakeProber::default()
    });
    let config = DiscoveryConfig {
        last_known: Some(ServerConnection::local("192.168.9.9:8080")),
        mdns_enabled: false,
        global_timeout: Duration::from_millis(50),
        ..DiscoveryConfig::default()
    };

    let err = discover(prober, &config).await.unwrap_err();
    assert_eq!(err, DiscoveryError::Timeout(Duration::from_millis(50)));
}

#[tokio::test]
async fn subnet_scan_never_exceeds_concurrency_cap() {
    let prober = Arc::new(FakeProber {
        probe_delay: Duration::from_millis(10),
        ..FakeProber::default()
    });

    let result = scan_subnet(Arc::clone(&prober), "192.168.1", 8080).await;
    assert!(result.is_none());

    assert_eq!(prober.probe_calls.load(Ordering::SeqCst), 254);
    assert!(prober.max_in_flight.load(Ordering::SeqCst) <= MAX_IN_FLIGHT);
}

#[tokio::test]
async fn subnet_scan_returns_first_hit_and_cancels_the_rest() {
    let prober = Arc::new(FakeProber {
        reachable: Some("192.168.1.3".to_string()),
        probe_delay: Duration::from_millis(5),
        ..FakeProber::default()
    });

    let result = scan_subnet(Arc::clone(&prober), "192.168.1", 8080).await;
    assert_eq!(result.as_deref(), Some("192.168.1.3"));

    assert!(prober.probe_calls.load(Ordering::SeqCst) <= 254);
    assert!(prober.max_in_flight.load(Ordering::SeqCst) <= MAX_IN_FLIGHT);
}
