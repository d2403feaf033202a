use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use comanda::api::PosApi;
use comanda::config::fetch_config;
use comanda::discovery::{self, DiscoveryConfig, probe::NetProber};
use comanda::storage::StateStore;
use comanda::sync::{Notification, OrderSync};
use comanda::websocket::connection::{ConnectionManager, ConnectionState};
use comanda::websocket::router::ConnectionHealth;
use comanda::{ComandaError, credentials};

#[tokio::main]
async fn main() -> Result<(), ComandaError> {
    tracing_subscriber::fmt::init();
    credentials::populate_env_from_keychain();

    let config = fetch_config()?;
    let store = StateStore::new(&config.state_file);
    let mut state = store.load();

    // A manual address skips discovery entirely; otherwise run the chain,
    // preferring env tunnel settings over the persisted ones.
    let server = match &config.server_addr {
        Some(addr) => discovery::validate_manual_address(addr)?,
        None => {
            let prober = Arc::new(NetProber::new()?);
            let discovery_config = DiscoveryConfig {
                tunnel: config.tunnel.clone().or_else(|| {
                    state.tunnel.enabled.then(|| state.tunnel.clone())
                }),
                last_known: state.last_connection.clone(),
                ..DiscoveryConfig::default()
            };
            discovery::discover(prober, &discovery_config).await?
        }
    };
    state.remember(&server);
    if let Err(e) = store.save(&state) {
        warn!("failed to persist client state: {e}");
    }

    let api = PosApi::new(&server)?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (state_tx, mut state_rx) = watch::channel(ConnectionState::Disconnected);
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let health = Arc::new(Mutex::new(ConnectionHealth::new()));

    let manager = ConnectionManager::new(
        server,
        config.role,
        config.auth_token.clone(),
        event_tx,
        state_tx,
        cmd_rx,
        Arc::clone(&health),
    );
    tokio::spawn(manager.run());

    let mut order_sync = OrderSync::new(config.role, cmd_tx);

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                match order_sync.apply(event) {
                    Some(Notification::ResyncRequired) => {
                        match api.active_orders().await {
                            Ok(orders) => {
                                info!(count = orders.len(), "reloaded active orders");
                                order_sync.replace_orders(orders);
                            }
                            Err(e) => warn!("failed to reload active orders: {e}"),
                        }
                    }
                    Some(notification) => info!(?notification, "order event"),
                    None => {}
                }
            }
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                info!(state = ?*state_rx.borrow_and_update(), "connection state");
            }
        }
    }

    Ok(())
}
