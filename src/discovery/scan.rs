//! Parallel subnet scan.
//!
//! The one place true fan-out concurrency is required: all 254 host
//! addresses of the local /24 are probed concurrently, bounded by a counting
//! semaphore so the LAN is not saturated, and racing probes are cancelled as
//! soon as a winner is accepted.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use super::probe::Prober;

/// Maximum number of in-flight probes during a subnet scan.
pub const MAX_IN_FLIGHT: usize = 32;

/// Probes every host of `subnet` (a /24 prefix such as `"192.168.1"`) and
/// returns the first address accepting a TCP connection on `port`.
///
/// Outstanding probes are aborted once a winner is found; dropping the
/// [`JoinSet`] cancels them, which closes their sockets.
pub async fn scan_subnet<P>(prober: Arc<P>, subnet: &str, port: u16) -> Option<String>
where
    P: Prober + 'static,
{
    info!(subnet, port, "scanning subnet for POS server");
    let semaphore = Arc::new(Semaphore::new(MAX_IN_FLIGHT));
    let mut probes = JoinSet::new();

    for host in 1..=254u8 {
        let ip = format!("{subnet}.{host}");
        let prober = Arc::clone(&prober);
        let semaphore = Arc::clone(&semaphore);
        probes.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok()?;
            prober.probe(&ip, port).await.then_some(ip)
        });
    }

    while let Some(result) = probes.join_next().await {
        if let Ok(Some(ip)) = result {
            info!(ip, "subnet scan found server");
            probes.abort_all();
            return Some(ip);
        }
    }

    debug!(subnet, "subnet scan found nothing");
    None
}
