//! Connection-to-identity session registry.
//!
//! Owns the mapping from live connection ids to their authenticated identity,
//! if any. Presence works in identity space only, so a user's presence
//! survives a reconnect under a fresh connection id.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{RelayError, Result};

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Option<String>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh connection with no identity attached.
    pub fn open(&self, connection_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(connection_id) {
            return Err(RelayError::DuplicateConnection(connection_id.to_string()));
        }
        sessions.insert(connection_id.to_string(), None);
        Ok(())
    }

    /// Bind an identity to an open connection.
    pub fn attach_identity(&self, connection_id: &str, user: &str) -> Result<()> {
        match self.sessions.write().get_mut(connection_id) {
            Some(slot) => {
                *slot = Some(user.to_string());
                Ok(())
            }
            None => Err(RelayError::UnknownConnection(connection_id.to_string())),
        }
    }

    pub fn identity_of(&self, connection_id: &str) -> Option<String> {
        self.sessions.read().get(connection_id).cloned().flatten()
    }

    /// Remove the connection and return whichever identity was attached.
    /// Closing an unknown id yields `None` without error, so duplicate
    /// disconnect signals from the transport are harmless.
    pub fn close(&self, connection_id: &str) -> Option<String> {
        self.sessions.write().remove(connection_id).flatten()
    }
}
