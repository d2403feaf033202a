//! Client→server command messages.
//!
//! Each command wraps its payload in the wire [`Envelope`] and sends it over
//! the writer half; replies, where they exist, arrive on the read side and
//! are handled by the router.

use tracing::info;

use super::{WsWriter, send_envelope};
use crate::Result;
use crate::models::order::OrderStatus;
use crate::models::{AuthenticateData, Envelope, KitchenAckData, KitchenUpdateData, MessageType};

/// Sends the `authenticate` handshake opener carrying the session token the
/// client holds, or an empty token for open-mode servers.
///
/// # Errors
///
/// Returns a [`ComandaError`](crate::ComandaError) if sending fails.
pub async fn authenticate(write: &mut WsWriter, token: Option<&str>) -> Result<()> {
    let data = AuthenticateData {
        token: token.unwrap_or_default().to_string(),
    };
    let envelope = Envelope::command(MessageType::Authenticate, &data)?;
    send_envelope(write, &envelope).await?;
    info!("sent authenticate");

    Ok(())
}

/// Sends a `kitchen_update` status transition command for an order.
///
/// # Errors
///
/// Returns a [`ComandaError`](crate::ComandaError) if sending fails.
pub async fn send_kitchen_update(
    write: &mut WsWriter,
    order_id: &str,
    status: OrderStatus,
) -> Result<()> {
    let data = KitchenUpdateData {
        order_id: order_id.to_string(),
        status,
        time: chrono::Utc::now().to_rfc3339(),
    };
    let envelope = Envelope::command(MessageType::KitchenUpdate, &data)?;
    send_envelope(write, &envelope).await?;
    info!(order_id, status = ?status, "sent kitchen_update");

    Ok(())
}

/// Sends a `kitchen_ack` confirming an order was received by the kitchen.
///
/// Acknowledgment is at-least-once: re-sending for an already-acknowledged
/// order is harmless and expected on duplicate broadcasts.
///
/// # Errors
///
/// Returns a [`ComandaError`](crate::ComandaError) if sending fails.
pub async fn send_kitchen_ack(
    write: &mut WsWriter,
    order_id: &str,
    order_number: &str,
) -> Result<()> {
    let data = KitchenAckData {
        order_id: order_id.to_string(),
        order_number: order_number.to_string(),
    };
    let envelope = Envelope::command(MessageType::KitchenAck, &data)?;
    send_envelope(write, &envelope).await?;
    info!(order_id, order_number, "sent kitchen_ack");

    Ok(())
}
