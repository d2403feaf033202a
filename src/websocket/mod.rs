//! Async WebSocket transport to the POS server.
//!
//! This module is organized by concern:
//! - [`commands`] - Client→server command messages
//! - [`router`] - Inbound envelope classification and connection health
//! - [`connection`] - Connection lifecycle, handshake, and reconnection

pub mod commands;
pub mod connection;
pub mod router;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};
use tungstenite::Message;

use crate::Result;
use crate::models::Envelope;

/// Write half of a POS server WebSocket connection.
pub type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Read half of a POS server WebSocket connection.
pub type WsReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Establishes a WebSocket connection to the given URL.
///
/// # Errors
///
/// Returns a [`ComandaError`](crate::ComandaError) if the connection or TLS
/// handshake fails.
pub async fn connect(url: &str) -> Result<(WsWriter, WsReader)> {
    let (ws_stream, _) = connect_async(url).await?;
    info!("WebSocket handshake completed");

    Ok(ws_stream.split())
}

/// Serializes and sends an [`Envelope`] over the WebSocket.
///
/// # Errors
///
/// Returns a [`ComandaError`](crate::ComandaError) if serialization or
/// sending fails.
pub async fn send_envelope(write: &mut WsWriter, envelope: &Envelope) -> Result<()> {
    let json = serde_json::to_string(envelope)?;
    write.send(Message::Text(json.into())).await?;
    debug!(message_type = envelope.tpe, "sent envelope");

    Ok(())
}
