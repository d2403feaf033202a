//! REST collaborators of the sync core.
//!
//! Order creation and reference data live behind the POS server's HTTP API.
//! Sending an order is a command, not a broadcast subscription: the client
//! issues a create/update request, awaits the direct response, and only a
//! success clears the cart — the broadcast echo then flows back through the
//! WebSocket and the reconciliation engine.

use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::Result;
use crate::discovery::ServerConnection;
use crate::models::catalog::{DiningTable, Product};
use crate::models::order::{Order, OrderItem, OrderSource, OrderStatus};
use crate::sync::cart::Cart;

/// Budget for one REST round trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Body of an order create/update request.
///
/// Item change tags are `#[serde(skip)]` on [`OrderItem`], so ephemeral
/// reconciliation metadata can never leak into this request.
#[derive(Debug, Serialize)]
pub struct NewOrderRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_number: Option<String>,
    pub source: OrderSource,
    pub items: Vec<OrderItem>,
}

/// HTTP client for the POS server's REST API.
pub struct PosApi {
    client: reqwest::Client,
    base_url: String,
}

impl PosApi {
    /// Creates an API client against the discovered server.
    ///
    /// # Errors
    ///
    /// Returns [`ComandaError::Http`](crate::ComandaError::Http) if the HTTP
    /// client cannot be built.
    pub fn new(server: &ServerConnection) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: server.http_base(),
        })
    }

    /// Creates an order.
    ///
    /// # Errors
    ///
    /// Returns a [`ComandaError`](crate::ComandaError) if the request fails
    /// or the server answers with an error status.
    pub async fn create_order(&self, request: &NewOrderRequest) -> Result<Order> {
        let response = self
            .client
            .post(format!("{}/api/orders", self.base_url))
            .json(request)
            .send()
            .await?
            .error_for_status()?;
        let order: Order = response.json().await?;
        info!(order_id = order.id, order_number = order.order_number, "order created");
        Ok(order)
    }

    /// Updates an existing order's items.
    ///
    /// # Errors
    ///
    /// Returns a [`ComandaError`](crate::ComandaError) if the request fails.
    pub async fn update_order(&self, order_id: &str, request: &NewOrderRequest) -> Result<Order> {
        let response = self
            .client
            .put(format!("{}/api/orders/{order_id}", self.base_url))
            .json(request)
            .send()
            .await?
            .error_for_status()?;
        let order: Order = response.json().await?;
        info!(order_id = order.id, "order updated");
        Ok(order)
    }

    /// Updates an order's status.
    ///
    /// # Errors
    ///
    /// Returns a [`ComandaError`](crate::ComandaError) if the request fails.
    pub async fn update_status(&self, order_id: &str, status: OrderStatus) -> Result<()> {
        #[derive(Serialize)]
        struct StatusBody {
            status: OrderStatus,
        }
        self.client
            .patch(format!("{}/api/orders/{order_id}/status", self.base_url))
            .json(&StatusBody { status })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Fetches all orders awaiting action, used for the full resync after a
    /// fresh connection.
    ///
    /// # Errors
    ///
    /// Returns a [`ComandaError`](crate::ComandaError) if the request fails.
    pub async fn active_orders(&self) -> Result<Vec<Order>> {
        let response = self
            .client
            .get(format!("{}/api/orders/active", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Fetches the product catalog.
    ///
    /// # Errors
    ///
    /// Returns a [`ComandaError`](crate::ComandaError) if the request fails.
    pub async fn products(&self) -> Result<Vec<Product>> {
        let response = self
            .client
            .get(format!("{}/api/products", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Fetches the dining tables.
    ///
    /// # Errors
    ///
    /// Returns a [`ComandaError`](crate::ComandaError) if the request fails.
    pub async fn tables(&self) -> Result<Vec<DiningTable>> {
        let response = self
            .client
            .get(format!("{}/api/tables", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Submits the cart as a new order. The cart is cleared only when the
    /// server confirms; on any failure it is preserved so the user can
    /// retry.
    ///
    /// # Errors
    ///
    /// Returns a [`ComandaError`](crate::ComandaError) if the request fails;
    /// the cart is left untouched in that case.
    pub async fn submit_cart(
        &self,
        cart: &mut Cart,
        table_number: Option<String>,
        source: OrderSource,
    ) -> Result<Order> {
        let request = NewOrderRequest {
            table_number,
            source,
            items: cart.to_order_items(),
        };
        let order = self.create_order(&request).await?;
        cart.clear();
        Ok(order)
    }
}
