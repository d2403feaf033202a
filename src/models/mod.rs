//! Shared models for the order-sync WebSocket protocol.
//!
//! Contains the wire envelope, message type definitions, the client role
//! declaration, and the payloads exchanged during the authentication
//! handshake and the kitchen acknowledgment protocol.

pub mod catalog;
pub mod order;

use serde::{Deserialize, Serialize};

use crate::models::order::{OrderStatus, deserialize_id};

/// Message types carried in the [`Envelope`] `type` field.
///
/// Unknown wire names are deliberately not represented here: the router
/// logs and drops them so that new server message types never crash old
/// clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// A newly created order, broadcast to kitchen and waiter clients.
    OrderNew,
    /// Alias for [`MessageType::OrderNew`] sent on the kitchen fan-out path.
    KitchenOrder,
    /// An updated order snapshot, or a lightweight `{order_id, status}` patch.
    OrderUpdate,
    /// An order was cancelled; clients mark it locally and schedule removal.
    OrderCancelled,
    /// Client→server status transition command.
    KitchenUpdate,
    /// Client→server acknowledgment that the kitchen received an order.
    KitchenAck,
    /// Server→client confirmation that a kitchen ack was recorded.
    KitchenAckResult,
    /// Client→server authentication handshake opener.
    Authenticate,
    /// Server→client handshake reply carrying the assigned client id.
    AuthResponse,
    /// Liveness signal; updates connection health and is otherwise ignored.
    Heartbeat,
}

impl MessageType {
    /// Returns the wire-format type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::OrderNew => "order_new",
            MessageType::KitchenOrder => "kitchen_order",
            MessageType::OrderUpdate => "order_update",
            MessageType::OrderCancelled => "order_cancelled",
            MessageType::KitchenUpdate => "kitchen_update",
            MessageType::KitchenAck => "kitchen_ack",
            MessageType::KitchenAckResult => "kitchen_ack_result",
            MessageType::Authenticate => "authenticate",
            MessageType::AuthResponse => "auth_response",
            MessageType::Heartbeat => "heartbeat",
        }
    }

    /// Parses a wire-format type name, `None` for unknown types.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "order_new" => Some(MessageType::OrderNew),
            "kitchen_order" => Some(MessageType::KitchenOrder),
            "order_update" => Some(MessageType::OrderUpdate),
            "order_cancelled" => Some(MessageType::OrderCancelled),
            "kitchen_update" => Some(MessageType::KitchenUpdate),
            "kitchen_ack" => Some(MessageType::KitchenAck),
            "kitchen_ack_result" => Some(MessageType::KitchenAckResult),
            "authenticate" => Some(MessageType::Authenticate),
            "auth_response" => Some(MessageType::AuthResponse),
            "heartbeat" => Some(MessageType::Heartbeat),
            _ => None,
        }
    }
}

/// The role a client declares when connecting, used by the server to route
/// role-appropriate messages (`/ws?type=<role>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRole {
    Pos,
    Kitchen,
    Waiter,
}

impl ClientRole {
    /// Returns the wire-format role name used in the `type` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientRole::Pos => "pos",
            ClientRole::Kitchen => "kitchen",
            ClientRole::Waiter => "waiter",
        }
    }

    /// Parses a role name, `None` for unknown roles.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pos" => Some(ClientRole::Pos),
            "kitchen" => Some(ClientRole::Kitchen),
            "waiter" => Some(ClientRole::Waiter),
            _ => None,
        }
    }
}

/// Wire message envelope exchanged over the WebSocket in both directions.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub tpe: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Envelope {
    /// Builds a client→server command envelope with the current timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ComandaError::Json`](crate::ComandaError::Json) if the
    /// payload cannot be serialized.
    pub fn command<T: Serialize>(tpe: MessageType, data: &T) -> crate::Result<Self> {
        Ok(Self {
            tpe: tpe.as_str().to_string(),
            client_id: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            data: serde_json::to_value(data)?,
        })
    }
}

/// Payload of an `authenticate` handshake message.
#[derive(Debug, Serialize)]
pub struct AuthenticateData {
    pub token: String,
}

/// Payload of an `auth_response` handshake reply.
#[derive(Debug, Deserialize)]
pub struct AuthResponseData {
    pub success: bool,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Payload of a `kitchen_update` status transition command.
#[derive(Debug, Serialize)]
pub struct KitchenUpdateData {
    pub order_id: String,
    pub status: OrderStatus,
    pub time: String,
}

/// Payload of a `kitchen_ack` acknowledgment command.
#[derive(Debug, Serialize, Deserialize)]
pub struct KitchenAckData {
    #[serde(deserialize_with = "deserialize_id")]
    pub order_id: String,
    pub order_number: String,
}

/// Payload of a `kitchen_ack_result` confirmation.
#[derive(Debug, Deserialize)]
pub struct KitchenAckResultData {
    #[serde(deserialize_with = "deserialize_id")]
    pub order_id: String,
    #[serde(default)]
    pub order_number: String,
    pub acknowledged: bool,
}

/// Payload of an `order_cancelled` broadcast.
#[derive(Debug, Deserialize)]
pub struct OrderCancelledData {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
}

/// Lightweight `order_update` payload carrying only a status transition.
#[derive(Debug, Deserialize)]
pub struct StatusPatchData {
    #[serde(deserialize_with = "deserialize_id")]
    pub order_id: String,
    pub status: OrderStatus,
}
