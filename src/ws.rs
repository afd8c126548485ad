//! WebSocket transport and connection lifecycle.
//!
//! One task pair per connection: the reader loop parses tagged-JSON client
//! events and dispatches them to the hub, a writer task drains the outbound
//! queue into the socket. Connect and disconnect are the only transitions not
//! driven by a client event, and they run exactly once per physical
//! connection here; duplicate disconnect signals are absorbed by the
//! registry's idempotent close.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AppState;
use crate::error::Result;
use crate::hub::RelayHub;
use crate::models::{ClientEvent, EventContext};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Credential forwarded by the fronting auth layer.
    pub user: Option<String>,
}

/// GET /ws
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state, query.user))
}

async fn handle_connection(socket: WebSocket, state: AppState, token: Option<String>) {
    let connection_id = Uuid::new_v4().to_string();
    let identity = state.identity.identify(token.as_deref()).await;
    let ctx = EventContext::new(connection_id.clone(), identity);
    let hub = state.hub;

    if let Err(err) = hub.sessions().open(&connection_id) {
        warn!(%connection_id, %err, "could not open session");
        return;
    }

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    hub.broadcaster().register(&connection_id, tx).await;

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(%err, "failed to serialize event");
                    continue;
                }
            };
            if sink.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    info!(connection_id = %ctx.connection_id, authenticated = ctx.authenticated, "client connected");
    if let Err(err) = hub.on_connect(&ctx).await {
        warn!(connection_id = %ctx.connection_id, %err, "connect push failed");
    }

    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(_) => break,
        };
        match frame {
            Message::Text(text) => {
                // Malformed frames are dropped without closing the connection.
                let Ok(event) = serde_json::from_str::<ClientEvent>(text.as_str()) else {
                    continue;
                };
                if let Err(err) = dispatch(&hub, &ctx, event).await {
                    warn!(connection_id = %ctx.connection_id, %err, "event handler failed");
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Deregister first so the departing connection is not counted among the
    // receivers of its own disconnect broadcast.
    hub.broadcaster().deregister(&ctx.connection_id).await;
    if let Err(err) = hub.on_disconnect(&ctx).await {
        warn!(connection_id = %ctx.connection_id, %err, "disconnect cleanup failed");
    }
    writer.abort();
    info!(connection_id = %ctx.connection_id, "client disconnected");
}

async fn dispatch(hub: &RelayHub, ctx: &EventContext, event: ClientEvent) -> Result<()> {
    match event {
        ClientEvent::History => hub.on_history(ctx).await,
        ClientEvent::Chat(payload) => hub.on_chat(ctx, payload).await,
        ClientEvent::Search { query } => hub.on_search(ctx, &query).await,
        ClientEvent::Heartbeat => hub.on_heartbeat(ctx).await,
    }
}
