//! Kitchen acknowledgment tracking on the sending side.
//!
//! A waiter/POS client that created an order tracks it here until the
//! kitchen's ack is confirmed. Absence of an ack within an operator-visible
//! window surfaces as a "not confirmed by kitchen" warning with a manual
//! resend action; this is a business-visible condition, not a network error.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::models::order::normalize_id;

/// One order sent to the kitchen and not yet confirmed.
#[derive(Debug, Clone)]
pub struct PendingAck {
    pub order_id: String,
    pub order_number: String,
    pub acknowledged: bool,
    pub sent_at: Instant,
}

/// Correlates sent orders with kitchen ack results.
#[derive(Debug, Default)]
pub struct AckTracker {
    pending: HashMap<String, PendingAck>,
}

impl AckTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that an order was sent to the kitchen. Re-tracking the same
    /// order (a manual resend) resets its clock.
    pub fn track(&mut self, order_id: &str, order_number: &str) {
        let order_id = normalize_id(order_id);
        debug!(order_id, order_number, "tracking order for kitchen ack");
        self.pending.insert(
            order_id.clone(),
            PendingAck {
                order_id,
                order_number: order_number.to_string(),
                acknowledged: false,
                sent_at: Instant::now(),
            },
        );
    }

    /// Applies a `kitchen_ack_result`. A positive result clears the pending
    /// entry for that order and only that order; a negative one leaves it
    /// pending. Returns whether a pending entry was cleared. Results for
    /// unknown orders are ignored, so duplicate confirmations are harmless.
    pub fn resolve(&mut self, order_id: &str, acknowledged: bool) -> bool {
        let order_id = normalize_id(order_id);
        if !acknowledged {
            debug!(order_id, "kitchen ack result negative, keeping pending");
            return false;
        }
        match self.pending.remove(&order_id) {
            Some(_) => {
                info!(order_id, "kitchen confirmed order");
                true
            }
            None => false,
        }
    }

    /// Whether the given order still awaits confirmation.
    pub fn is_pending(&self, order_id: &str) -> bool {
        self.pending.contains_key(&normalize_id(order_id))
    }

    /// Orders sent at least `window` ago and still unconfirmed, oldest
    /// first. These get the "not confirmed by kitchen" warning.
    pub fn unconfirmed(&self, window: Duration) -> Vec<&PendingAck> {
        let now = Instant::now();
        let mut stale: Vec<&PendingAck> = self
            .pending
            .values()
            .filter(|ack| now.duration_since(ack.sent_at) >= window)
            .collect();
        stale.sort_by_key(|ack| ack.sent_at);
        stale
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
