//! WebSocket endpoint for the real-time ring event feed.
//!
//! Each connection gets its own subscription, optionally scoped to one ring
//! via `?ring_id=`. Events are per-ring in commit order; a client that falls
//! behind the feed window misses deltas and should re-fetch the ring when
//! the carried version jumps.

use super::AppState;
use crate::events::RingEvent;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::stream::Stream;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub ring_id: Option<Uuid>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let stream = state.notifier.subscribe(query.ring_id);
    ws.on_upgrade(move |socket| run_subscription(socket, stream, query.ring_id))
}

async fn run_subscription(
    socket: WebSocket,
    stream: impl Stream<Item = RingEvent> + Send + 'static,
    ring_id: Option<Uuid>,
) {
    debug!(?ring_id, "websocket subscriber connected");
    let (mut sender, mut receiver) = socket.split();
    let mut stream = Box::pin(stream);

    loop {
        tokio::select! {
            event = stream.next() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(error = %err, "failed to serialize ring event");
                        continue;
                    }
                };
                if sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }

    debug!(?ring_id, "websocket subscriber disconnected");
}
