//! Crate-level error types.
//!
//! [`ComandaError`] unifies every error source (configuration, WebSocket,
//! JSON, HTTP, discovery) behind a single enum so callers can match on the
//! variant they care about while still using the `?` operator for easy
//! propagation.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ComandaError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum ComandaError {
    /// Invalid or inconsistent configuration (env vars, manual address).
    #[error("configuration error: {0}")]
    Config(String),

    /// A WebSocket operation (connect, send, receive) failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An HTTP request to the POS server failed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Filesystem access (persisted client state) failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport opened but the server rejected the authentication
    /// handshake. Distinct from [`ComandaError::Discovery`] so the UI can
    /// give "check credentials" guidance instead of "check server is running".
    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    /// An inbound frame could not be interpreted.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// No reachable POS server was found.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

/// Why endpoint discovery failed.
///
/// "Timed out" and "no server responded" are surfaced separately: the former
/// suggests a congested or filtered network, the latter that no server is
/// running at all. Both are non-fatal and paired with a manual-address
/// fallback in the UI.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    /// The global discovery budget elapsed before every strategy finished.
    #[error("discovery timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Every strategy completed and none found a reachable server.
    #[error("no POS server responded via tunnel or local network")]
    NoServerFound,
}
