//! Event Notifier: fans ring state deltas out to subscribers.
//!
//! Delivery is at-least-once per live subscriber and per-ring in commit
//! order; there is no ordering guarantee across rings. A lagging subscriber
//! is dropped from the window rather than blocking writers, so consumers
//! must tolerate gaps: watch the carried version and re-fetch authoritative
//! state when it jumps.

use crate::store::{EntityKind, RingStore, StoreOp};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

/// Wire-facing state delta for one committed entity write.
#[derive(Debug, Clone, Serialize)]
pub struct RingEvent {
    pub entity_type: EntityKind,
    pub operation: StoreOp,
    pub ring_id: Uuid,
    pub version: u64,
    pub payload: serde_json::Value,
}

/// Subscription fan-out over the store's change feed.
#[derive(Clone)]
pub struct EventNotifier {
    store: Arc<dyn RingStore>,
}

impl EventNotifier {
    pub fn new(store: Arc<dyn RingStore>) -> Self {
        Self { store }
    }

    /// Subscribe to ring deltas, optionally scoped to one ring.
    pub fn subscribe(&self, ring_id: Option<Uuid>) -> impl Stream<Item = RingEvent> + Send + 'static {
        BroadcastStream::new(self.store.watch()).filter_map(move |item| {
            futures::future::ready(match item {
                Ok(event) => {
                    if ring_id.map_or(true, |id| event.ring_id == id) {
                        let payload = serde_json::to_value(&event.payload)
                            .unwrap_or(serde_json::Value::Null);
                        Some(RingEvent {
                            entity_type: event.entity,
                            operation: event.op,
                            ring_id: event.ring_id,
                            version: event.version,
                            payload,
                        })
                    } else {
                        None
                    }
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagged; deltas dropped");
                    None
                }
            })
        })
    }
}
