//! Central event router.
//!
//! Accepts inbound client events, validates them against the session
//! registry, persists messages, updates presence, and fans the resulting
//! events out either to the requesting connection or to everyone. Broadcasts
//! are emitted only after persistence succeeds, so a store failure never
//! produces a partial broadcast.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::broadcast::Broadcaster;
use crate::error::{RelayError, Result};
use crate::models::{EventContext, MessagePayload, OutgoingMessage, ServerEvent};
use crate::presence::PresenceTracker;
use crate::session::SessionRegistry;
use crate::store::MessageStore;

/// Hours of history surfaced to clients.
pub const HISTORY_WINDOW_HOURS: i64 = 24;

// Inline media budgets. Data URLs grow roughly a third over the raw bytes,
// so these sit above the intended binary thresholds (~15 MB image, ~35 MB file).
const MAX_IMAGE_BYTES: usize = 20_000_000;
const MAX_FILE_BYTES: usize = 50_000_000;

pub struct RelayHub {
    store: Arc<MessageStore>,
    presence: Arc<PresenceTracker>,
    sessions: Arc<SessionRegistry>,
    broadcaster: Arc<Broadcaster>,
}

impl RelayHub {
    pub fn new(
        store: Arc<MessageStore>,
        presence: Arc<PresenceTracker>,
        sessions: Arc<SessionRegistry>,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Self {
            store,
            presence,
            sessions,
            broadcaster,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// New connection: greet it and push history plus the current roster to
    /// that connection only. Nothing is broadcast, presence has not changed.
    pub async fn on_connect(&self, ctx: &EventContext) -> Result<()> {
        self.broadcaster
            .send_to(
                &ctx.connection_id,
                ServerEvent::System {
                    text: "Connected to chat relay".to_string(),
                },
            )
            .await;
        self.push_history(ctx).await?;

        let users = self.presence.active_users(Utc::now());
        let count = users.len();
        self.broadcaster
            .send_to(&ctx.connection_id, ServerEvent::Users { users, count })
            .await;
        Ok(())
    }

    /// Client-driven refresh: same history push as on connect.
    pub async fn on_history(&self, ctx: &EventContext) -> Result<()> {
        self.push_history(ctx).await
    }

    /// Validate, persist, then broadcast a submitted message to everyone,
    /// sender included. Empty and oversized payloads are dropped silently;
    /// an unauthenticated sender gets exactly one error notice.
    pub async fn on_chat(&self, ctx: &EventContext, payload: MessagePayload) -> Result<()> {
        let payload = payload.normalized();
        if payload.is_empty() {
            return Ok(());
        }
        if oversized(&payload) {
            warn!(connection_id = %ctx.connection_id, "dropping oversized media payload");
            return Ok(());
        }

        let Some(user) = self.bind_identity(ctx) else {
            self.broadcaster
                .send_to(
                    &ctx.connection_id,
                    ServerEvent::Error {
                        text: RelayError::AuthRequired.to_string(),
                    },
                )
                .await;
            return Ok(());
        };

        let (id, _) = self.store.append(Some(&user), &payload).await?;
        info!(connection_id = %ctx.connection_id, user = %user, message_id = id, "message persisted");

        self.broadcaster
            .send_to_all(&ServerEvent::Chat(OutgoingMessage {
                user,
                body: payload,
            }))
            .await;
        Ok(())
    }

    /// Search the trailing window; results go to the requester only. An
    /// empty query answers immediately with an empty result set.
    pub async fn on_search(&self, ctx: &EventContext, query: &str) -> Result<()> {
        let results = self.store.search(query, HISTORY_WINDOW_HOURS).await?;
        self.broadcaster
            .send_to(&ctx.connection_id, ServerEvent::SearchResults { results })
            .await;
        Ok(())
    }

    /// Presence keep-alive. A no-op for unauthenticated connections;
    /// otherwise every heartbeat refreshes the roster for everyone.
    pub async fn on_heartbeat(&self, ctx: &EventContext) -> Result<()> {
        let Some(user) = self.bind_identity(ctx) else {
            return Ok(());
        };
        self.presence.heartbeat(&user, Utc::now());
        self.push_roster().await;
        Ok(())
    }

    /// Tear down the session. The roster is re-broadcast only when a bound
    /// identity actually held a live presence entry.
    pub async fn on_disconnect(&self, ctx: &EventContext) -> Result<()> {
        let Some(user) = self.sessions.close(&ctx.connection_id) else {
            return Ok(());
        };
        if self.presence.remove(&user) {
            info!(connection_id = %ctx.connection_id, user = %user, "identity went offline");
            self.push_roster().await;
        }
        Ok(())
    }

    async fn push_history(&self, ctx: &EventContext) -> Result<()> {
        let messages = self.store.query_recent(HISTORY_WINDOW_HOURS).await?;
        self.broadcaster
            .send_to(&ctx.connection_id, ServerEvent::History { messages })
            .await;
        Ok(())
    }

    async fn push_roster(&self) {
        let users = self.presence.active_users(Utc::now());
        let count = users.len();
        self.broadcaster
            .send_to_all(&ServerEvent::Users { users, count })
            .await;
    }

    /// The connection's authenticated identity, binding it in the registry on
    /// first use. A failed bind (connection already gone) downgrades the event
    /// to unauthenticated rather than tearing anything down.
    fn bind_identity(&self, ctx: &EventContext) -> Option<String> {
        if !ctx.authenticated {
            return None;
        }
        let user = ctx.identity.clone()?;
        if self.sessions.identity_of(&ctx.connection_id).is_none() {
            if let Err(err) = self.sessions.attach_identity(&ctx.connection_id, &user) {
                warn!(connection_id = %ctx.connection_id, %err, "could not bind identity");
                return None;
            }
        }
        Some(user)
    }
}

fn oversized(payload: &MessagePayload) -> bool {
    payload
        .image
        .as_deref()
        .is_some_and(|data| data.len() > MAX_IMAGE_BYTES)
        || payload
            .file
            .as_deref()
            .is_some_and(|data| data.len() > MAX_FILE_BYTES)
}
