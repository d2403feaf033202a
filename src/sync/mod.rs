//! Client-side order synchronization state.
//!
//! This module glues the router's event stream to the local working set:
//! - [`reconcile`] - merging authoritative snapshots into held orders
//! - [`cart`] - the optimistic cart being assembled
//! - [`acks`] - kitchen acknowledgment correlation
//!
//! [`OrderSync`] applies events one at a time; together with user-initiated
//! cart mutations it is the only writer of this state, running on a single
//! sequential update stream.

pub mod acks;
pub mod cart;
pub mod reconcile;

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::models::ClientRole;
use crate::models::order::{Order, OrderStatus};
use crate::websocket::connection::ConnectionCommand;
use crate::websocket::router::SyncEvent;
use acks::{AckTracker, PendingAck};
use cart::Cart;
use reconcile::ActiveOrders;

/// A user-visible consequence of applying an event, for the UI layer to
/// turn into a sound, highlight, or warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    NewOrder {
        order_id: String,
        order_number: String,
    },
    OrderChanged {
        order_id: String,
    },
    StatusChanged {
        order_id: String,
        status: OrderStatus,
    },
    OrderCancelled {
        order_id: String,
    },
    KitchenConfirmed {
        order_id: String,
    },
    /// A fresh connection was established; reload active orders via REST.
    ResyncRequired,
}

/// Applies inbound [`SyncEvent`]s to the local order, cart, and ack state.
pub struct OrderSync {
    role: ClientRole,
    orders: ActiveOrders,
    cart: Cart,
    acks: AckTracker,
    commands: mpsc::UnboundedSender<ConnectionCommand>,
}

impl OrderSync {
    #[must_use]
    pub fn new(role: ClientRole, commands: mpsc::UnboundedSender<ConnectionCommand>) -> Self {
        Self {
            role,
            orders: ActiveOrders::new(),
            cart: Cart::new(),
            acks: AckTracker::new(),
            commands,
        }
    }

    pub fn orders(&self) -> &ActiveOrders {
        &self.orders
    }

    pub fn orders_mut(&mut self) -> &mut ActiveOrders {
        &mut self.orders
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    pub fn acks(&self) -> &AckTracker {
        &self.acks
    }

    /// Applies one inbound event, returning the user-visible consequence,
    /// if any. Duplicate snapshots and no-op patches return `None` so the
    /// UI never re-notifies.
    pub fn apply(&mut self, event: SyncEvent) -> Option<Notification> {
        match event {
            SyncEvent::OrderSnapshot(order) => self.apply_snapshot(order),
            SyncEvent::StatusPatch { order_id, status } => {
                if self.orders.apply_status(&order_id, status) {
                    Some(Notification::StatusChanged { order_id, status })
                } else {
                    None
                }
            }
            SyncEvent::OrderCancelled { order_id } => {
                if self.orders.mark_cancelled(&order_id) {
                    Some(Notification::OrderCancelled { order_id })
                } else {
                    debug!(order_id, "cancellation for unknown order dropped");
                    None
                }
            }
            SyncEvent::AckResult {
                order_id,
                acknowledged,
                ..
            } => {
                if self.acks.resolve(&order_id, acknowledged) {
                    Some(Notification::KitchenConfirmed { order_id })
                } else {
                    None
                }
            }
            SyncEvent::Resync => Some(Notification::ResyncRequired),
            // The handshake consumes auth replies; a stray one is a no-op.
            SyncEvent::AuthResponse { .. } => None,
            SyncEvent::Heartbeat => None,
        }
    }

    fn apply_snapshot(&mut self, order: Order) -> Option<Notification> {
        let order_id = order.id.clone();
        let order_number = order.order_number.clone();
        let outcome = self.orders.apply_snapshot(order);

        // Kitchen clients confirm receipt automatically, duplicates
        // included: the ack protocol is at-least-once and idempotent.
        if self.role == ClientRole::Kitchen {
            let _ = self.commands.send(ConnectionCommand::KitchenAck {
                order_id: order_id.clone(),
                order_number: order_number.clone(),
            });
        }

        if !outcome.visible {
            return None;
        }
        if outcome.new_order {
            Some(Notification::NewOrder {
                order_id,
                order_number,
            })
        } else {
            Some(Notification::OrderChanged { order_id })
        }
    }

    /// Replaces the working set after a resync reload.
    pub fn replace_orders(&mut self, orders: Vec<Order>) {
        self.orders.replace_all(orders);
    }

    /// Records that an order was sent to the kitchen, for ack correlation.
    /// Call again after a manual resend to reset the warning clock.
    pub fn track_send(&mut self, order: &Order) {
        self.acks.track(&order.id, &order.order_number);
    }

    /// Sent orders still unconfirmed after `window`.
    pub fn unconfirmed(&self, window: Duration) -> Vec<&PendingAck> {
        self.acks.unconfirmed(window)
    }

    /// Issues a status transition command for an order.
    pub fn send_status(&self, order_id: &str, status: OrderStatus) {
        let _ = self.commands.send(ConnectionCommand::KitchenUpdate {
            order_id: order_id.to_string(),
            status,
        });
    }
}
