//! WebSocket connection lifecycle management.
//!
//! [`ConnectionManager`] owns one persistent connection to the POS server:
//! it connects, performs the authentication handshake, pumps inbound frames
//! through the router, sends transport-level heartbeats, and reconnects with
//! exponential backoff and jitter after an abnormal close. The connection
//! state is published through a `watch` cell so UI code can observe
//! transitions without ever setting them directly.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tungstenite::Message as WsMessage;

use super::router::{ConnectionHealth, SyncEvent, route};
use super::{WsReader, WsWriter, commands, connect};
use crate::discovery::ServerConnection;
use crate::models::ClientRole;
use crate::models::order::OrderStatus;
use crate::{ComandaError, Result};

/// Initial backoff between reconnection attempts.
const INITIAL_BACKOFF: Duration = Duration::from_secs(3);

/// Maximum backoff between reconnection attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Transport-level ping interval, well inside the health window so a
/// half-open connection is detected long before idle timeouts fire.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);

/// How long to wait for the `auth_response` after sending `authenticate`.
const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection lifecycle state, observed by UI code through a `watch` cell.
///
/// Transitions happen only inside [`ConnectionManager`]; the client id is
/// scoped to one manager instance, never process-global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected { client_id: String, is_tunnel: bool },
    Error(String),
}

/// Commands sent from the application layer to the connection manager.
#[derive(Debug)]
pub enum ConnectionCommand {
    /// Acknowledge that the kitchen received an order.
    KitchenAck {
        order_id: String,
        order_number: String,
    },
    /// Transition an order's status.
    KitchenUpdate {
        order_id: String,
        status: OrderStatus,
    },
    /// Close the connection and stop the manager.
    Disconnect,
}

/// Why the reader loop exited.
enum DisconnectReason {
    /// The connection was lost or errored; the manager will reconnect.
    ConnectionError,
    /// A clean shutdown was requested.
    Shutdown,
}

/// Manages the WebSocket connection lifecycle including the authentication
/// handshake and reconnection with exponential backoff.
pub struct ConnectionManager {
    server: ServerConnection,
    role: ClientRole,
    token: Option<String>,
    events: mpsc::UnboundedSender<SyncEvent>,
    state: watch::Sender<ConnectionState>,
    cmd_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
    health: Arc<Mutex<ConnectionHealth>>,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    #[must_use]
    pub fn new(
        server: ServerConnection,
        role: ClientRole,
        token: Option<String>,
        events: mpsc::UnboundedSender<SyncEvent>,
        state: watch::Sender<ConnectionState>,
        cmd_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        health: Arc<Mutex<ConnectionHealth>>,
    ) -> Self {
        Self {
            server,
            role,
            token,
            events,
            state,
            cmd_rx,
            health,
        }
    }

    /// Runs the connection manager until a clean shutdown.
    ///
    /// `run` consumes the manager, so a second connect attempt on an
    /// already-connected instance is impossible by construction. An
    /// authentication rejection stops the manager instead of retrying:
    /// backoff cannot fix bad credentials.
    pub async fn run(mut self) {
        let mut backoff = INITIAL_BACKOFF;

        loop {
            self.state.send_replace(ConnectionState::Connecting);

            let url = self.server.ws_url(self.role);
            info!(url = %url, "connecting to POS server");
            let (mut write, mut read) = match connect(&url).await {
                Ok(pair) => pair,
                Err(e) => {
                    error!("connection failed: {e}");
                    self.state.send_replace(ConnectionState::Error(e.to_string()));
                    let delay = jittered(backoff);
                    info!(backoff_secs = delay.as_secs(), "backing off before retry");
                    tokio::time::sleep(delay).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    continue;
                }
            };

            let client_id = match self.handshake(&mut write, &mut read).await {
                Ok(client_id) => client_id,
                Err(e @ ComandaError::AuthRejected(_)) => {
                    error!("{e}");
                    self.state.send_replace(ConnectionState::Error(e.to_string()));
                    return;
                }
                Err(e) => {
                    warn!("handshake failed: {e}");
                    self.state.send_replace(ConnectionState::Error(e.to_string()));
                    tokio::time::sleep(jittered(backoff)).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    continue;
                }
            };

            info!(client_id, "authenticated with POS server");
            self.state.send_replace(ConnectionState::Connected {
                client_id,
                is_tunnel: self.server.is_tunnel,
            });
            lock(&self.health).on_connect();
            backoff = INITIAL_BACKOFF;

            // No delta continuity exists across reconnects: every fresh
            // connection requires a full reload of active orders.
            if self.events.send(SyncEvent::Resync).is_err() {
                return;
            }

            let reason = self.read_loop(&mut write, &mut read).await;
            lock(&self.health).on_disconnect();
            self.state.send_replace(ConnectionState::Disconnected);

            match reason {
                DisconnectReason::ConnectionError => {
                    let delay = jittered(backoff);
                    info!(backoff_secs = delay.as_secs(), "connection lost, backing off");
                    tokio::time::sleep(delay).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                DisconnectReason::Shutdown => {
                    info!("connection manager shutting down");
                    return;
                }
            }
        }
    }

    /// Sends `authenticate` and waits for the matching `auth_response`.
    async fn handshake(&self, write: &mut WsWriter, read: &mut WsReader) -> Result<String> {
        commands::authenticate(write, self.token.as_deref()).await?;

        let reply = tokio::time::timeout(AUTH_TIMEOUT, async {
            while let Some(msg) = read.next().await {
                match msg? {
                    WsMessage::Text(text) => {
                        if let Some(SyncEvent::AuthResponse {
                            success,
                            client_id,
                            message,
                        }) = route(&text)
                        {
                            return match (success, client_id) {
                                (true, Some(client_id)) => Ok(client_id),
                                (true, None) => Err(ComandaError::AuthRejected(
                                    "auth_response missing client_id".to_string(),
                                )),
                                (false, _) => Err(ComandaError::AuthRejected(
                                    message.unwrap_or_else(|| "server refused token".to_string()),
                                )),
                            };
                        }
                        // Frames arriving before auth_response are dropped.
                    }
                    _ => {}
                }
            }
            Err(ComandaError::MalformedMessage(
                "connection closed during handshake".to_string(),
            ))
        })
        .await;

        match reply {
            Ok(result) => result,
            Err(_) => Err(ComandaError::MalformedMessage(
                "timed out waiting for auth_response".to_string(),
            )),
        }
    }

    /// Pumps frames and commands until disconnection or shutdown.
    ///
    /// Messages from a single connection are delivered in order; there is no
    /// message-level parallelism here by design.
    async fn read_loop(&mut self, write: &mut WsWriter, read: &mut WsReader) -> DisconnectReason {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it, we just connected.
        heartbeat.tick().await;

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(WsMessage::Text(text))) => {
                            lock(&self.health).on_message();
                            match route(&text) {
                                Some(SyncEvent::Heartbeat) => {}
                                Some(event) => {
                                    if self.events.send(event).is_err() {
                                        return DisconnectReason::Shutdown;
                                    }
                                }
                                None => {}
                            }
                        }
                        Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => {
                            lock(&self.health).on_message();
                        }
                        Some(Ok(_)) => {} // Binary/Close frames
                        Some(Err(e)) => {
                            warn!("websocket error: {e}");
                            return DisconnectReason::ConnectionError;
                        }
                        None => {
                            warn!("websocket stream ended");
                            return DisconnectReason::ConnectionError;
                        }
                    }
                }

                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(ConnectionCommand::KitchenAck { order_id, order_number }) => {
                            if let Err(e) = commands::send_kitchen_ack(write, &order_id, &order_number).await {
                                warn!("failed to send kitchen_ack: {e}");
                                return DisconnectReason::ConnectionError;
                            }
                        }
                        Some(ConnectionCommand::KitchenUpdate { order_id, status }) => {
                            if let Err(e) = commands::send_kitchen_update(write, &order_id, status).await {
                                warn!("failed to send kitchen_update: {e}");
                                return DisconnectReason::ConnectionError;
                            }
                        }
                        Some(ConnectionCommand::Disconnect) | None => {
                            return DisconnectReason::Shutdown;
                        }
                    }
                }

                _ = heartbeat.tick() => {
                    if write.send(WsMessage::Ping(Vec::new().into())).await.is_err() {
                        warn!("heartbeat ping failed");
                        return DisconnectReason::ConnectionError;
                    }
                }
            }
        }
    }
}

/// Locks the shared health cell, recovering from poisoning.
fn lock(health: &Mutex<ConnectionHealth>) -> std::sync::MutexGuard<'_, ConnectionHealth> {
    health.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Adds up to 25% of clock-noise jitter so a fleet of clients dropped by a
/// server restart does not reconnect in lockstep.
fn jittered(base: Duration) -> Duration {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    base + base.mul_f64(f64::from(nanos % 1000) / 4000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_within_a_quarter_of_base() {
        let base = Duration::from_secs(4);
        for _ in 0..100 {
            let delay = jittered(base);
            assert!(delay >= base);
            assert!(delay <= base + Duration::from_secs(1));
        }
    }

    #[test]
    fn state_starts_disconnected() {
        let (tx, rx) = watch::channel(ConnectionState::Disconnected);
        assert_eq!(*rx.borrow(), ConnectionState::Disconnected);
        drop(tx);
    }
}
