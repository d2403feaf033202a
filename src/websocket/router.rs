//! Inbound envelope classification and connection health.
//!
//! The router turns raw text frames into typed [`SyncEvent`]s. Malformed
//! frames and unknown message types are logged and dropped; they must never
//! crash the reader loop or tear down the connection.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::models::order::{Order, OrderStatus};
use crate::models::{
    AuthResponseData, Envelope, KitchenAckResultData, MessageType, OrderCancelledData,
    StatusPatchData,
};

/// A typed inbound event produced by [`route`].
#[derive(Debug)]
pub enum SyncEvent {
    /// A full authoritative order snapshot to reconcile against local state.
    OrderSnapshot(Order),
    /// A lightweight status transition for an order already held.
    StatusPatch { order_id: String, status: OrderStatus },
    /// The order was cancelled server-side.
    OrderCancelled { order_id: String },
    /// A kitchen ack was recorded for the given order.
    AckResult {
        order_id: String,
        order_number: String,
        acknowledged: bool,
    },
    /// Authentication handshake reply.
    AuthResponse {
        success: bool,
        client_id: Option<String>,
        message: Option<String>,
    },
    /// Liveness signal; callers update health and otherwise ignore it.
    Heartbeat,
    /// A fresh connection was established; active orders must be reloaded
    /// because no delta continuity exists across reconnects.
    Resync,
}

/// Classifies a raw inbound frame into a [`SyncEvent`].
///
/// Returns `None` for malformed frames, unknown message types, and
/// payloads that fail to parse; all three are logged and dropped so new
/// server message types never crash old clients.
pub fn route(text: &str) -> Option<SyncEvent> {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "dropping malformed frame");
            return None;
        }
    };

    let Some(message_type) = MessageType::parse(&envelope.tpe) else {
        warn!(message_type = envelope.tpe, "dropping unknown message type");
        return None;
    };

    match message_type {
        MessageType::Heartbeat => Some(SyncEvent::Heartbeat),
        MessageType::OrderNew | MessageType::KitchenOrder => {
            parse_data::<Order>(envelope.data, message_type).map(SyncEvent::OrderSnapshot)
        }
        MessageType::OrderUpdate => {
            // A full snapshot carries items; anything else is a status patch.
            if envelope.data.get("items").is_some() {
                parse_data::<Order>(envelope.data, message_type).map(SyncEvent::OrderSnapshot)
            } else {
                parse_data::<StatusPatchData>(envelope.data, message_type).map(|patch| {
                    SyncEvent::StatusPatch {
                        order_id: patch.order_id,
                        status: patch.status,
                    }
                })
            }
        }
        MessageType::OrderCancelled => parse_data::<OrderCancelledData>(envelope.data, message_type)
            .map(|data| SyncEvent::OrderCancelled { order_id: data.id }),
        MessageType::KitchenAckResult => {
            parse_data::<KitchenAckResultData>(envelope.data, message_type).map(|data| {
                SyncEvent::AckResult {
                    order_id: data.order_id,
                    order_number: data.order_number,
                    acknowledged: data.acknowledged,
                }
            })
        }
        MessageType::AuthResponse => {
            parse_data::<AuthResponseData>(envelope.data, message_type).map(|data| {
                SyncEvent::AuthResponse {
                    success: data.success,
                    client_id: data.client_id,
                    message: data.message,
                }
            })
        }
        MessageType::Authenticate | MessageType::KitchenUpdate | MessageType::KitchenAck => {
            warn!(
                message_type = message_type.as_str(),
                "dropping client-bound message type received from server"
            );
            None
        }
    }
}

fn parse_data<T: serde::de::DeserializeOwned>(
    data: serde_json::Value,
    message_type: MessageType,
) -> Option<T> {
    match serde_json::from_value(data) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(
                message_type = message_type.as_str(),
                error = %e,
                "dropping payload that failed to parse"
            );
            None
        }
    }
}

/// Window after which a silent connection is considered a zombie.
pub const HEALTH_WINDOW: Duration = Duration::from_secs(120);

/// Derived connection health.
///
/// Health is derived, not pushed: a connection is healthy while it is
/// connected and any message (heartbeats included) arrived within
/// [`HEALTH_WINDOW`]. This distinguishes a zombie connection (socket open,
/// server stopped responding) from a clean disconnect.
#[derive(Debug)]
pub struct ConnectionHealth {
    connected: bool,
    last_message: Instant,
}

impl Default for ConnectionHealth {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionHealth {
    /// Starts disconnected.
    pub fn new() -> Self {
        Self {
            connected: false,
            last_message: Instant::now(),
        }
    }

    /// Marks the transport connected and resets the message clock.
    pub fn on_connect(&mut self) {
        self.connected = true;
        self.last_message = Instant::now();
        debug!("connection health: connected");
    }

    /// Marks the transport disconnected.
    pub fn on_disconnect(&mut self) {
        self.connected = false;
    }

    /// Records that any message was seen on the connection.
    pub fn on_message(&mut self) {
        self.on_message_at(Instant::now());
    }

    pub(crate) fn on_message_at(&mut self, now: Instant) {
        self.last_message = now;
    }

    /// Whether the connection is connected and recently talkative.
    pub fn is_healthy(&self) -> bool {
        self.is_healthy_at(Instant::now())
    }

    pub(crate) fn is_healthy_at(&self, now: Instant) -> bool {
        self.connected && now.duration_since(self.last_message) < HEALTH_WINDOW
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_requires_connection() {
        let health = ConnectionHealth::new();
        assert!(!health.is_healthy());
    }

    #[test]
    fn health_expires_after_silence() {
        let mut health = ConnectionHealth::new();
        health.on_connect();
        let now = Instant::now();
        health.on_message_at(now);

        assert!(health.is_healthy_at(now + Duration::from_secs(119)));
        assert!(!health.is_healthy_at(now + Duration::from_secs(121)));
    }

    #[test]
    fn disconnect_overrides_recent_messages() {
        let mut health = ConnectionHealth::new();
        health.on_connect();
        health.on_message();
        health.on_disconnect();
        assert!(!health.is_healthy());
    }
}
