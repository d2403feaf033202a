//! Local shopping-cart state.
//!
//! The cart is the optimistic working copy of an order being assembled for
//! a table or takeout. Lines are keyed by `(product_id, modifiers, notes)` —
//! deliberately stricter than the reconciliation diff key, because within a
//! single cart two entries with the same product and notes but different
//! modifier sets are legitimately separate lines.

use rust_decimal::Decimal;
use tracing::warn;

use crate::models::catalog::Product;
use crate::models::order::{ItemChange, Modifier, Order, OrderItem};

/// One line of the cart.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub product_id: String,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub notes: String,
    pub modifiers: Vec<Modifier>,
}

impl CartLine {
    /// Unit price including modifier deltas.
    pub fn effective_price(&self) -> Decimal {
        self.modifiers
            .iter()
            .fold(self.unit_price, |price, m| price + m.price_delta)
    }

    /// Line subtotal.
    pub fn subtotal(&self) -> Decimal {
        self.effective_price() * Decimal::from(self.quantity)
    }

    fn same_line(&self, other: &CartLine) -> bool {
        self.product_id == other.product_id
            && self.notes == other.notes
            && sorted_modifier_ids(&self.modifiers) == sorted_modifier_ids(&other.modifiers)
    }
}

fn sorted_modifier_ids(modifiers: &[Modifier]) -> Vec<&str> {
    let mut ids: Vec<&str> = modifiers.iter().map(|m| m.id.as_str()).collect();
    ids.sort_unstable();
    ids
}

/// An ordered list of cart lines with merge-on-add semantics.
///
/// Purely local optimistic state: it is cleared only after the server
/// confirms the order, and preserved on failure so the user can retry.
#[derive(Debug, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Adds a line; a line matching an existing key increments its quantity
    /// instead of appending a duplicate.
    pub fn add(&mut self, line: CartLine) {
        if line.quantity == 0 {
            return;
        }
        match self.lines.iter_mut().find(|held| held.same_line(&line)) {
            Some(held) => held.quantity += line.quantity,
            None => self.lines.push(line),
        }
    }

    /// Sets the quantity of the line at `index`; a quantity of zero or less
    /// removes the line entirely. A zero-quantity line never survives.
    pub fn set_quantity(&mut self, index: usize, quantity: i32) {
        if index >= self.lines.len() {
            return;
        }
        if quantity <= 0 {
            self.lines.remove(index);
        } else {
            self.lines[index].quantity = quantity as u32;
        }
    }

    /// Removes the line at `index`.
    pub fn remove(&mut self, index: usize) {
        if index < self.lines.len() {
            self.lines.remove(index);
        }
    }

    /// Cart total including modifier deltas.
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Empties the cart after a confirmed send.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Converts the cart into order items for a create/update request.
    ///
    /// Change tags never appear here; they are `#[serde(skip)]` ephemeral
    /// state and the lines are built fresh.
    pub fn to_order_items(&self) -> Vec<OrderItem> {
        self.lines
            .iter()
            .map(|line| OrderItem {
                product_id: line.product_id.clone(),
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                subtotal: line.subtotal(),
                notes: line.notes.clone(),
                modifiers: line.modifiers.clone(),
                change: ItemChange::Unchanged,
                previous_quantity: None,
            })
            .collect()
    }

    /// Rebuilds a cart from an existing order, e.g. to edit it.
    ///
    /// Items whose product is missing from the catalog are dropped with a
    /// log line; a partial cart beats a crashed edit screen.
    pub fn from_order(order: &Order, catalog: &[Product]) -> Self {
        let mut cart = Cart::new();
        for item in &order.items {
            if item.change == ItemChange::Removed {
                continue;
            }
            if !catalog.iter().any(|p| p.id == item.product_id) {
                warn!(
                    product_id = item.product_id,
                    order_id = order.id,
                    "unknown product in order, dropping line from cart"
                );
                continue;
            }
            cart.add(CartLine {
                product_id: item.product_id.clone(),
                product_name: item.product_name.clone(),
                unit_price: item.unit_price,
                quantity: item.quantity,
                notes: item.notes.clone(),
                modifiers: item.modifiers.clone(),
            });
        }
        cart
    }
}
