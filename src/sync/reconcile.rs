//! Order reconciliation engine.
//!
//! Merges a freshly received authoritative order snapshot into the locally
//! held working set, computing a per-item change set for visual diffing and
//! deciding whether the update is user-visible (trigger sound/highlight) or
//! a silent duplicate. The diff is recomputed fresh on every inbound
//! snapshot; it never consults prior diffs.

use tracing::debug;

use crate::models::order::{ItemChange, Order, OrderItem, OrderStatus, normalize_id};

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// At least one item changed; the UI should notify.
    pub visible: bool,
    /// The order id had never been seen before.
    pub new_order: bool,
}

/// The client-side working set of orders awaiting action.
///
/// Single-writer: the reconciliation engine and user-initiated mutations
/// both run on the owning client's sequential state-update stream, so no
/// internal locking is needed.
#[derive(Debug, Default)]
pub struct ActiveOrders {
    orders: Vec<Order>,
}

impl ActiveOrders {
    pub fn new() -> Self {
        Self::default()
    }

    /// The held orders, newest-first for genuinely new arrivals.
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn get(&self, order_id: &str) -> Option<&Order> {
        let id = normalize_id(order_id);
        self.orders.iter().find(|o| o.id == id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Replaces the whole working set, e.g. after a reconnect resync.
    pub fn replace_all(&mut self, mut orders: Vec<Order>) {
        for order in &mut orders {
            order.id = normalize_id(&order.id);
            for item in &mut order.items {
                item.change = ItemChange::Unchanged;
                item.previous_quantity = None;
            }
        }
        self.orders = orders;
    }

    /// Reconciles an authoritative snapshot against the held state.
    ///
    /// A never-seen order id is inserted at the head with every item
    /// `Unchanged` (first sight) and counts as a visible change. A known
    /// order is replaced in place, preserving its list position, with each
    /// item tagged by the `(product_id, notes)` diff; a snapshot identical
    /// to what is already held yields `visible == false` so duplicate
    /// broadcasts never re-trigger notifications.
    pub fn apply_snapshot(&mut self, mut incoming: Order) -> ReconcileOutcome {
        incoming.id = normalize_id(&incoming.id);

        let Some(position) = self.orders.iter().position(|o| o.id == incoming.id) else {
            for item in &mut incoming.items {
                item.change = ItemChange::Unchanged;
                item.previous_quantity = None;
            }
            debug!(order_id = incoming.id, "new order inserted at head");
            self.orders.insert(0, incoming);
            return ReconcileOutcome {
                visible: true,
                new_order: true,
            };
        };

        let new_items = std::mem::take(&mut incoming.items);
        incoming.items = diff_items(&self.orders[position].items, new_items);
        let visible = incoming
            .items
            .iter()
            .any(|item| item.change != ItemChange::Unchanged);
        self.orders[position] = incoming;

        ReconcileOutcome {
            visible,
            new_order: false,
        }
    }

    /// Applies a lightweight status patch. Returns whether anything changed.
    pub fn apply_status(&mut self, order_id: &str, status: OrderStatus) -> bool {
        let id = normalize_id(order_id);
        match self.orders.iter_mut().find(|o| o.id == id) {
            Some(order) if order.status != status => {
                order.status = status;
                true
            }
            Some(_) => false,
            None => {
                debug!(order_id = id, "status patch for unknown order dropped");
                false
            }
        }
    }

    /// Marks an order cancelled locally. Removal is scheduled separately so
    /// the UI can show the cancellation first. Returns whether the order
    /// was held.
    pub fn mark_cancelled(&mut self, order_id: &str) -> bool {
        self.apply_status(order_id, OrderStatus::Cancelled)
            || self.get(order_id).is_some()
    }

    /// Drops cancelled orders from the working set.
    pub fn purge_cancelled(&mut self) {
        self.orders.retain(|o| o.status != OrderStatus::Cancelled);
    }

    /// Removes one order outright.
    pub fn remove(&mut self, order_id: &str) {
        let id = normalize_id(order_id);
        self.orders.retain(|o| o.id != id);
    }
}

/// Computes the merged item list for a known order.
///
/// Items are matched across snapshots by `(product_id, notes)`. Tombstones
/// from the previous pass (`Removed`) are not part of the live baseline and
/// are dropped here; items present only in the old live set are retained as
/// new tombstones so the UI can render a struck-through line.
fn diff_items(old: &[OrderItem], new: Vec<OrderItem>) -> Vec<OrderItem> {
    let live: Vec<&OrderItem> = old
        .iter()
        .filter(|item| item.change != ItemChange::Removed)
        .collect();

    let mut merged = Vec::with_capacity(new.len());
    for mut item in new {
        match live.iter().find(|prev| prev.diff_key() == item.diff_key()) {
            Some(prev) if prev.quantity == item.quantity => {
                item.change = ItemChange::Unchanged;
                item.previous_quantity = None;
            }
            Some(prev) => {
                item.change = ItemChange::Modified;
                item.previous_quantity = Some(prev.quantity);
            }
            None => {
                item.change = ItemChange::Added;
                item.previous_quantity = None;
            }
        }
        merged.push(item);
    }

    for prev in live {
        let still_present = merged
            .iter()
            .any(|item| item.diff_key() == prev.diff_key());
        if !still_present {
            let mut tombstone = prev.clone();
            tombstone.change = ItemChange::Removed;
            tombstone.previous_quantity = None;
            merged.push(tombstone);
        }
    }

    merged
}
