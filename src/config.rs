//! Application configuration loaded from environment variables.
//!
//! - `COMANDA_ROLE` — client role: `pos`, `kitchen`, or `waiter` (default `pos`)
//! - `COMANDA_SERVER_ADDR` — manual server address, skipping discovery
//! - `COMANDA_TUNNEL_URL` — tunnel host for remote connections
//! - `COMANDA_TUNNEL_SECURE` — `1`/`true` to use TLS towards the tunnel
//! - `COMANDA_AUTH_TOKEN` — session token for the handshake (usually
//!   populated from the keychain, see [`crate::credentials`])
//! - `COMANDA_STATE_FILE` — path of the persisted state file

use std::path::PathBuf;

use crate::discovery::TunnelSettings;
use crate::models::ClientRole;

/// Default persisted-state file, relative to the working directory.
const DEFAULT_STATE_FILE: &str = "comanda_state.json";

/// Top-level application configuration.
#[derive(Debug)]
pub struct AppConfig {
    pub role: ClientRole,
    /// Manual override; validated by the discovery module before probing.
    pub server_addr: Option<String>,
    /// Tunnel settings from the environment; when unset, the persisted
    /// tunnel settings apply.
    pub tunnel: Option<TunnelSettings>,
    pub auth_token: Option<String>,
    pub state_file: PathBuf,
}

/// Loads the application configuration from environment variables.
///
/// # Errors
///
/// Returns [`ComandaError::Config`](crate::ComandaError::Config) if
/// `COMANDA_ROLE` is set to an unknown role.
pub fn fetch_config() -> crate::Result<AppConfig> {
    let role = match non_empty_var("COMANDA_ROLE") {
        Some(raw) => ClientRole::parse(&raw).ok_or_else(|| {
            crate::ComandaError::Config(format!(
                "COMANDA_ROLE must be pos, kitchen, or waiter, got {raw:?}"
            ))
        })?,
        None => ClientRole::Pos,
    };

    let tunnel = non_empty_var("COMANDA_TUNNEL_URL").map(|url| TunnelSettings {
        enabled: true,
        url,
        secure: flag_var("COMANDA_TUNNEL_SECURE"),
    });

    Ok(AppConfig {
        role,
        server_addr: non_empty_var("COMANDA_SERVER_ADDR"),
        tunnel,
        auth_token: non_empty_var("COMANDA_AUTH_TOKEN"),
        state_file: non_empty_var("COMANDA_STATE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE)),
    })
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// Interprets an environment variable as a boolean flag.
fn flag_var(name: &str) -> bool {
    matches!(
        std::env::var(name).ok().as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}
