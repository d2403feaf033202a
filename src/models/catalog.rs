//! Reference data served by the POS server's REST API.
//!
//! Read-only from this crate's perspective; cached locally with a validity
//! window so clients can keep operating while discovery or a reconnect is
//! in progress.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::order::deserialize_id;

/// A sellable product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub category: Option<String>,
}

/// A dining table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiningTable {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub number: String,
    #[serde(default)]
    pub area: Option<String>,
}
