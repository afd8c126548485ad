//! Event fan-out to connected clients.
//!
//! The hub talks to connections through this capability only; the WebSocket
//! layer registers one outbound queue per connection and drains it into the
//! socket from its own writer task, so a slow socket never blocks fan-out to
//! the others.

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use crate::models::ServerEvent;

pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

#[derive(Default)]
pub struct Broadcaster {
    connections: RwLock<HashMap<String, EventSender>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, connection_id: &str, sender: EventSender) {
        self.connections
            .write()
            .await
            .insert(connection_id.to_string(), sender);
    }

    pub async fn deregister(&self, connection_id: &str) {
        self.connections.write().await.remove(connection_id);
    }

    /// Deliver an event to one connection. A send to a connection whose
    /// receiver is already gone is logged and dropped, never an error.
    pub async fn send_to(&self, connection_id: &str, event: ServerEvent) {
        let connections = self.connections.read().await;
        if let Some(sender) = connections.get(connection_id) {
            if sender.send(event).is_err() {
                warn!(connection_id, "dropping event for closed connection");
            }
        }
    }

    /// Deliver an event to every registered connection.
    pub async fn send_to_all(&self, event: &ServerEvent) {
        let connections = self.connections.read().await;
        for (connection_id, sender) in connections.iter() {
            if sender.send(event.clone()).is_err() {
                warn!(%connection_id, "dropping event for closed connection");
            }
        }
        debug!(recipients = connections.len(), "broadcast event");
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}
