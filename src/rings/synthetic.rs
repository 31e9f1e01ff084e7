//! Synthetic participants for demo rings.
//!
//! Demo rings are filled by a server-side driver that goes through the same
//! `join` contract as real clients, so real and demo rings share one state
//! machine. The driver only touches rings flagged `is_demo` and stops as
//! soon as the ring is full or leaves the admission states.

use crate::config::DemoSettings;
use crate::errors::RingError;
use crate::lifecycle::RingEngine;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Spawn a filler task for one demo ring. Returns immediately; the task
/// joins one synthetic identity per interval tick until the ring stops
/// admitting.
pub fn spawn_filler(
    engine: Arc<RingEngine>,
    ring_id: Uuid,
    settings: DemoSettings,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match engine.get_ring(ring_id).await {
            Ok(snapshot) if snapshot.ring.is_demo => {}
            Ok(_) => {
                tracing::warn!(%ring_id, "filler requested for non-demo ring; refusing");
                return;
            }
            Err(err) => {
                tracing::warn!(%ring_id, error = %err, "filler could not read ring");
                return;
            }
        }

        let mut interval = tokio::time::interval(settings.join_interval());
        // The first tick fires immediately; skip it so a human joiner gets a
        // head start over the bots.
        interval.tick().await;

        for identity in &settings.identities {
            interval.tick().await;
            if !join_one(&engine, ring_id, identity).await {
                return;
            }
        }
    })
}

/// Attempt one synthetic admission, retrying the whole join on conflicts.
/// Returns false once the ring no longer admits anyone.
async fn join_one(engine: &RingEngine, ring_id: Uuid, identity: &str) -> bool {
    loop {
        match engine.join_ring(ring_id, identity, identity, true).await {
            Ok(_) => {
                tracing::debug!(%ring_id, identity, "synthetic participant admitted");
                return true;
            }
            Err(err) if err.is_retryable() => continue,
            Err(RingError::AlreadyJoined { .. }) => return true,
            Err(RingError::RingFull { .. })
            | Err(RingError::RingClosed { .. })
            | Err(RingError::NotFound { .. }) => return false,
            Err(err) => {
                tracing::warn!(%ring_id, identity, error = %err, "synthetic join failed");
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineSettings;
    use crate::payment::AutoApproveGate;
    use crate::rings::types::RingStatus;
    use crate::store::MemoryRingStore;

    fn engine() -> Arc<RingEngine> {
        Arc::new(RingEngine::new(
            Arc::new(MemoryRingStore::new()),
            Arc::new(AutoApproveGate::new()),
            EngineSettings {
                payment_timeout_ms: 1_000,
                spin_delay_ms: 0,
            },
        ))
    }

    fn fast_demo_settings() -> DemoSettings {
        DemoSettings {
            enabled: true,
            join_interval_ms: 1,
            identities: (1..=7).map(|i| format!("bot-{}", i)).collect(),
        }
    }

    #[tokio::test]
    async fn test_filler_stops_at_capacity() {
        let engine = engine();
        let snapshot = engine
            .create_ring("alice", "Alice", 1.0, 4, true)
            .await
            .unwrap();

        spawn_filler(engine.clone(), snapshot.ring.id, fast_demo_settings())
            .await
            .unwrap();

        let filled = engine.get_ring(snapshot.ring.id).await.unwrap();
        assert_eq!(filled.ring.current_participants, 4);
        assert_eq!(filled.ring.total_pot, 4.0);
        assert_eq!(filled.ring.status, RingStatus::Active);
        assert!(filled.participants.iter().skip(1).all(|p| p.synthetic));
    }

    #[tokio::test]
    async fn test_filler_refuses_non_demo_ring() {
        let engine = engine();
        let snapshot = engine
            .create_ring("alice", "Alice", 1.0, 4, false)
            .await
            .unwrap();

        spawn_filler(engine.clone(), snapshot.ring.id, fast_demo_settings())
            .await
            .unwrap();

        let ring = engine.get_ring(snapshot.ring.id).await.unwrap().ring;
        assert_eq!(ring.current_participants, 1);
    }
}
