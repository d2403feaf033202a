//! Reachability probing.
//!
//! [`Prober`] is the seam between the discovery orchestrator and the
//! network: every strategy funnels its reachability checks through it, so
//! tests can substitute a fake and assert which strategies actually ran.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;

/// Budget for a single HTTP health check.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Budget for a single TCP reachability probe. Kept short so sequential
/// strategies (last-known IP, common addresses) feel near-instant.
const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Network reachability checks used by every discovery strategy.
pub trait Prober: Send + Sync {
    /// Issues a `GET {base_url}/health` probe; any 2xx means "server present".
    fn check_health(&self, base_url: &str) -> impl Future<Output = bool> + Send;

    /// Checks whether a TCP connection to `host:port` can be opened.
    fn probe(&self, host: &str, port: u16) -> impl Future<Output = bool> + Send;
}

/// Production [`Prober`] backed by `reqwest` and `tokio::net`.
pub struct NetProber {
    client: reqwest::Client,
}

impl NetProber {
    /// Creates a prober with the per-probe timeouts baked in.
    ///
    /// # Errors
    ///
    /// Returns [`ComandaError::Http`](crate::ComandaError::Http) if the HTTP
    /// client cannot be built.
    pub fn new() -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HEALTH_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

impl Prober for NetProber {
    async fn check_health(&self, base_url: &str) -> bool {
        match self.client.get(format!("{base_url}/health")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(base_url, error = %e, "health check failed");
                false
            }
        }
    }

    async fn probe(&self, host: &str, port: u16) -> bool {
        let addr = match format!("{host}:{port}").parse::<SocketAddr>() {
            Ok(addr) => addr,
            // Hostnames go through the resolver instead of a parsed addr.
            Err(_) => {
                return matches!(
                    tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect((host, port))).await,
                    Ok(Ok(_))
                );
            }
        };
        matches!(
            tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(addr)).await,
            Ok(Ok(_))
        )
    }
}
