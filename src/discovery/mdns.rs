//! Local-network service discovery.
//!
//! The POS server advertises itself as `_posserver._tcp`; a broadcast
//! lookup resolves it to an address without prior configuration. The hit is
//! only trusted after a reachability probe by the orchestrator, since stale
//! mDNS caches outlive dead servers.

use std::time::{Duration, Instant};

use mdns_sd::{ServiceDaemon, ServiceEvent};
use tracing::{debug, warn};

/// Well-known service type advertised by the POS server.
pub const SERVICE_TYPE: &str = "_posserver._tcp.local.";

/// Browses for the POS service, returning the first resolved `(ip, port)`
/// within `timeout`.
///
/// `mdns-sd` runs its own socket thread, so the blocking receive loop is
/// moved off the async runtime.
pub async fn lookup(timeout: Duration) -> Option<(String, u16)> {
    let result = tokio::task::spawn_blocking(move || browse_blocking(timeout)).await;
    match result {
        Ok(found) => found,
        Err(e) => {
            warn!(error = %e, "mDNS lookup task failed");
            None
        }
    }
}

fn browse_blocking(timeout: Duration) -> Option<(String, u16)> {
    let daemon = match ServiceDaemon::new() {
        Ok(daemon) => daemon,
        Err(e) => {
            warn!(error = %e, "failed to start mDNS daemon");
            return None;
        }
    };
    let receiver = match daemon.browse(SERVICE_TYPE) {
        Ok(receiver) => receiver,
        Err(e) => {
            warn!(error = %e, "failed to browse mDNS service");
            let _ = daemon.shutdown();
            return None;
        }
    };

    let deadline = Instant::now() + timeout;
    let mut found = None;
    while found.is_none() {
        let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
            break;
        };
        match receiver.recv_timeout(remaining) {
            Ok(ServiceEvent::ServiceResolved(info)) => {
                if let Some(addr) = info.get_addresses().iter().next() {
                    debug!(address = %addr, port = info.get_port(), "mDNS resolved POS server");
                    found = Some((addr.to_string(), info.get_port()));
                }
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }

    let _ = daemon.shutdown();
    found
}
