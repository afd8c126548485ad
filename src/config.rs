//! Relay configuration and shared handler state.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::IdentityProvider;
use crate::hub::RelayHub;

#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// SQLite database file for the message log.
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("relay.db"),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
        }
    }
}

impl RelayConfig {
    /// Read configuration from the environment: `RELAY_DB` for the database
    /// path, `PORT` for the listen port.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("RELAY_DB") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            config.bind_addr = SocketAddr::from(([0, 0, 0, 0], port));
        }
        config
    }
}

/// App state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<RelayHub>,
    pub identity: Arc<dyn IdentityProvider>,
}
