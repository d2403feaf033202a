//! Real-time order synchronization client for the Comanda restaurant POS.
//!
//! Provides endpoint discovery (tunnel, mDNS, cached IP, subnet scan), a
//! persistent WebSocket connection with authentication and reconnection,
//! typed routing of order lifecycle events, and client-side reconciliation
//! of server-pushed order snapshots against local order/cart state.

pub mod api;
pub mod config;
pub mod credentials;
pub mod discovery;
pub mod error;
pub mod models;
pub mod storage;
pub mod sync;
pub mod websocket;

pub use error::{ComandaError, DiscoveryError, Result};
