//! Persisted client state.
//!
//! A small JSON file keeps what the client needs across sessions: the last
//! successful server address and mode for fast reconnection, the tunnel
//! settings, and cached reference data so the order and cart screens stay
//! usable while discovery or a reconnect is in progress.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::Result;
use crate::discovery::{ServerConnection, TunnelSettings};
use crate::models::catalog::{DiningTable, Product};

/// How long cached reference data stays usable.
const CATALOG_VALIDITY_MINUTES: i64 = 30;

/// Reference data cached from the server, stamped at fetch time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedCatalog {
    pub fetched_at: DateTime<Utc>,
    pub products: Vec<Product>,
    pub tables: Vec<DiningTable>,
}

impl CachedCatalog {
    pub fn now(products: Vec<Product>, tables: Vec<DiningTable>) -> Self {
        Self {
            fetched_at: Utc::now(),
            products,
            tables,
        }
    }

    /// Whether the cache is still inside its validity window.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.fetched_at)
            < chrono::Duration::minutes(CATALOG_VALIDITY_MINUTES)
    }
}

/// Everything the client persists between sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientState {
    /// Last successful connection, retried first on the next discovery run.
    pub last_connection: Option<ServerConnection>,
    #[serde(default)]
    pub tunnel: TunnelSettings,
    #[serde(default)]
    pub catalog: Option<CachedCatalog>,
}

impl ClientState {
    /// Records a discovery winner for fast reconnection next session.
    pub fn remember(&mut self, connection: &ServerConnection) {
        self.last_connection = Some(connection.clone());
    }

    /// Cached products, only while fresh.
    pub fn fresh_catalog(&self) -> Option<&CachedCatalog> {
        self.catalog
            .as_ref()
            .filter(|catalog| catalog.is_fresh(Utc::now()))
    }
}

/// File-backed store for [`ClientState`].
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted state. A missing or corrupt file yields the
    /// default state; losing a cache is never worth failing startup over.
    pub fn load(&self) -> ClientState {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no persisted state");
                return ClientState::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt state file, starting fresh");
                ClientState::default()
            }
        }
    }

    /// Saves the state, writing to a sibling temp file first so a crash
    /// mid-write never corrupts the previous state.
    ///
    /// # Errors
    ///
    /// Returns [`ComandaError::Io`](crate::ComandaError::Io) or
    /// [`ComandaError::Json`](crate::ComandaError::Json) on failure.
    pub fn save(&self, state: &ClientState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "persisted client state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let state = store.load();
        assert!(state.last_connection.is_none());
        assert!(!state.tunnel.enabled);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        let mut state = ClientState::default();
        state.remember(&ServerConnection::local("192.168.1.50:8080"));
        state.tunnel = TunnelSettings {
            enabled: true,
            url: "https://pos.example.com".to_string(),
            secure: true,
        };
        store.save(&state).unwrap();

        let loaded = store.load();
        let connection = loaded.last_connection.unwrap();
        assert_eq!(connection.address, "192.168.1.50:8080");
        assert!(!connection.is_tunnel);
        assert!(loaded.tunnel.enabled);
    }

    #[test]
    fn corrupt_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();
        let state = StateStore::new(path).load();
        assert!(state.last_connection.is_none());
    }

    #[test]
    fn catalog_freshness_window() {
        let catalog = CachedCatalog::now(Vec::new(), Vec::new());
        assert!(catalog.is_fresh(Utc::now()));
        assert!(!catalog.is_fresh(Utc::now() + chrono::Duration::minutes(31)));
    }
}
