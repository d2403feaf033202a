//! Order and order-item models shared by the router, the reconciliation
//! engine, and the REST collaborators.
//!
//! An order's identity never changes across updates; only its fields do.
//! The per-item [`ItemChange`] tag is ephemeral reconciliation metadata:
//! it is recomputed on every pass and never serialized back to the server.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Delivered,
    Paid,
    Cancelled,
}

/// Which channel created the order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSource {
    #[default]
    Pos,
    Waiter,
    Web,
}

/// How an item changed relative to the previously held snapshot.
///
/// `Removed` items are retained in the merged item list so the UI can render
/// a struck-through line; they are dropped on the next reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ItemChange {
    #[default]
    Unchanged,
    Added,
    Modified,
    Removed,
}

/// A modifier applied to an order item (e.g. "extra cheese"), carrying a
/// price delta relative to the base product price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Modifier {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price_delta: Decimal,
}

/// A single line of an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(deserialize_with = "deserialize_id")]
    pub product_id: String,
    #[serde(default)]
    pub product_name: String,
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: Decimal,
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    /// Reconciliation tag; never sent back to the server.
    #[serde(skip)]
    pub change: ItemChange,
    /// Quantity before the change when `change == Modified`.
    #[serde(skip)]
    pub previous_quantity: Option<u32>,
}

impl OrderItem {
    /// Identity key for item matching across snapshots.
    ///
    /// Two items are "the same" line iff product and notes match exactly.
    /// Items with identical product and notes added separately collapse into
    /// one logical line with summed quantity.
    pub fn diff_key(&self) -> (&str, &str) {
        (&self.product_id, &self.notes)
    }
}

/// An order as broadcast by the POS server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub order_number: String,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_number: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub source: OrderSource,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Normalizes a wire-encoded order/product ID to its canonical integer-string
/// form.
///
/// Numeric IDs that cross a JSON-number boundary can arrive float-formatted
/// (`"39.0"`); the trailing fraction must be stripped before the value is
/// used as a lookup key anywhere, or identity matching silently breaks.
/// Idempotent: already-canonical IDs pass through unchanged.
pub fn normalize_id(raw: &str) -> String {
    if let Some((integer, fraction)) = raw.split_once('.')
        && !integer.is_empty()
        && !fraction.is_empty()
        && integer.chars().all(|c| c.is_ascii_digit())
        && fraction.chars().all(|c| c == '0')
    {
        return integer.to_string();
    }
    raw.to_string()
}

/// Deserializes an ID that may arrive as a JSON string or number, applying
/// [`normalize_id`].
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(normalize_id(&s)),
        serde_json::Value::Number(n) => Ok(normalize_id(&n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
