//! Ring Lifecycle Controller.
//!
//! Enforces the state machine (waiting -> active -> spinning -> finished)
//! and the admission rules. Every transition is a single atomic
//! read-modify-write keyed by ring id: read the current snapshot, validate
//! business rules against it, write conditioned on the version read. On a
//! version conflict the whole operation fails with `Conflict` and the caller
//! retries from a fresh read; the engine never reapplies a stale delta.
//!
//! The controller holds no state of its own beyond in-flight operation
//! context; the store owns everything persisted.

use crate::config::EngineSettings;
use crate::errors::{ConsistencyError, RingError, RingResult};
use crate::fairness;
use crate::payment::{PaymentGate, Receipt};
use crate::rings::types::{Participant, Ring, RingFilter, RingSnapshot, RingStatus};
use crate::store::RingStore;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Participant count at which a waiting ring becomes active.
const ACTIVATION_THRESHOLD: u32 = 2;

pub struct RingEngine {
    store: Arc<dyn RingStore>,
    gate: Arc<dyn PaymentGate>,
    settings: EngineSettings,
}

impl RingEngine {
    pub fn new(
        store: Arc<dyn RingStore>,
        gate: Arc<dyn PaymentGate>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            gate,
            settings,
        }
    }

    /// Create a ring in `waiting` with the creator auto-admitted as
    /// participant 1. The creator's buy-in is charged before the ring exists.
    pub async fn create_ring(
        &self,
        creator_identity: &str,
        display_label: &str,
        buy_in: f64,
        max_participants: u32,
        is_demo: bool,
    ) -> RingResult<RingSnapshot> {
        if !buy_in.is_finite() || buy_in <= 0.0 {
            return Err(RingError::InvalidParameter(format!(
                "buy_in must be positive, got {}",
                buy_in
            )));
        }
        if max_participants < 2 {
            return Err(RingError::InvalidParameter(format!(
                "max_participants must be at least 2, got {}",
                max_participants
            )));
        }
        if creator_identity.is_empty() {
            return Err(RingError::InvalidParameter(
                "creator identity must not be empty".to_string(),
            ));
        }

        let receipt = self.charge(buy_in, creator_identity).await?;

        // The seed is drawn before any admission can close and only its
        // commitment is published until the reveal at finalize.
        let seed = fairness::generate_seed();
        let ring_id = Uuid::new_v4();
        let ring = Ring {
            id: ring_id,
            creator_identity: creator_identity.to_string(),
            buy_in,
            max_participants,
            current_participants: 1,
            total_pot: buy_in,
            status: RingStatus::Waiting,
            winner_identity: None,
            seed_commitment: fairness::commitment_for(&seed),
            seed: None,
            is_demo,
            version: 1,
            created_at: Utc::now(),
        };
        let creator = Participant {
            id: Uuid::new_v4(),
            ring_id,
            identity: creator_identity.to_string(),
            display_label: display_label.to_string(),
            synthetic: false,
            joined_at: Utc::now(),
            payment_receipt: receipt.clone(),
        };

        if let Err(err) = self.store.insert(ring, seed, creator).await {
            self.compensate(&receipt).await;
            return Err(err);
        }

        tracing::info!(%ring_id, creator = creator_identity, buy_in, max_participants, is_demo, "ring created");
        self.store.get(ring_id).await
    }

    /// Admit an identity into a ring, charging the buy-in first.
    ///
    /// Fails without mutating ring state when the ring is closed or full,
    /// the identity already joined, or the payment is declined or times out.
    /// A `Conflict` after payment refunds the receipt; the caller retries
    /// the whole operation against a fresh read.
    pub async fn join_ring(
        &self,
        ring_id: Uuid,
        identity: &str,
        display_label: &str,
        synthetic: bool,
    ) -> RingResult<Participant> {
        if identity.is_empty() {
            return Err(RingError::InvalidParameter(
                "identity must not be empty".to_string(),
            ));
        }

        let snapshot = self.store.get(ring_id).await?;
        let ring = &snapshot.ring;

        if !ring.status.is_admitting() {
            return Err(RingError::RingClosed {
                ring_id,
                status: ring.status,
            });
        }
        if ring.current_participants >= ring.max_participants {
            return Err(RingError::RingFull {
                ring_id,
                max_participants: ring.max_participants,
            });
        }
        if snapshot.contains_identity(identity) {
            return Err(RingError::AlreadyJoined {
                ring_id,
                identity: identity.to_string(),
            });
        }

        let receipt = self.charge(ring.buy_in, identity).await?;

        let participant = Participant {
            id: Uuid::new_v4(),
            ring_id,
            identity: identity.to_string(),
            display_label: display_label.to_string(),
            synthetic,
            joined_at: Utc::now(),
            payment_receipt: receipt.clone(),
        };

        let mut updated = ring.clone();
        updated.version += 1;
        updated.current_participants += 1;
        // Derive the pot from the admitted count, never from a stale total.
        updated.total_pot = updated.buy_in * updated.current_participants as f64;
        if updated.status == RingStatus::Waiting
            && updated.current_participants >= ACTIVATION_THRESHOLD
        {
            updated.status = RingStatus::Active;
        }

        match self
            .store
            .admit(ring.version, updated, participant.clone())
            .await
        {
            Ok(()) => {
                tracing::info!(%ring_id, identity, synthetic, "participant admitted");
                Ok(participant)
            }
            Err(err) => {
                self.compensate(&receipt).await;
                Err(err)
            }
        }
    }

    /// Close admission and run the draw. Creator only, active rings only.
    ///
    /// The transition to `spinning` is a compare-and-swap, so of any number
    /// of concurrent callers exactly one closes admission and the
    /// spin/finalize sequence runs exactly once per ring.
    pub async fn start_spin(&self, ring_id: Uuid, requester_identity: &str) -> RingResult<RingSnapshot> {
        let snapshot = self.store.get(ring_id).await?;
        let ring = &snapshot.ring;

        if ring.creator_identity != requester_identity {
            return Err(RingError::Unauthorized {
                ring_id,
                requester: requester_identity.to_string(),
            });
        }
        if ring.current_participants < ACTIVATION_THRESHOLD {
            return Err(RingError::InsufficientParticipants {
                ring_id,
                current: ring.current_participants,
            });
        }
        if ring.status != RingStatus::Active {
            return Err(RingError::InvalidState {
                ring_id,
                expected: RingStatus::Active,
                actual: ring.status,
            });
        }

        let mut spinning = ring.clone();
        spinning.version += 1;
        spinning.status = RingStatus::Spinning;
        self.store.compare_and_swap(ring.version, spinning).await?;
        tracing::info!(%ring_id, "admission closed, spinning");

        let delay = self.settings.spin_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        // Participant list is closed now; the draw is a pure function of it
        // and the seed committed at creation.
        let seed = self.store.fairness_seed(ring_id).await?;
        let closed = self.store.get(ring_id).await?;
        let winner = fairness::select_winner(&closed.participants, &seed)
            .identity
            .clone();

        self.finalize(ring_id, &winner, &seed).await
    }

    /// Record the winner: `spinning` -> `finished`, seed revealed.
    ///
    /// This is the fairness path's entry point and must only run on a
    /// spinning ring; anything else is a protocol violation that surfaces as
    /// a `ConsistencyError` and is never retried.
    pub async fn finalize(
        &self,
        ring_id: Uuid,
        winner_identity: &str,
        seed: &str,
    ) -> RingResult<RingSnapshot> {
        let snapshot = self.store.get(ring_id).await?;
        let ring = &snapshot.ring;

        if ring.status != RingStatus::Spinning {
            let err = ConsistencyError::FinalizeOutOfOrder {
                ring_id,
                status: ring.status,
            };
            tracing::error!(%ring_id, status = %ring.status, "finalize invoked out of order");
            return Err(err.into());
        }
        if !snapshot.contains_identity(winner_identity) {
            let err = ConsistencyError::WinnerNotParticipant {
                ring_id,
                winner: winner_identity.to_string(),
            };
            tracing::error!(%ring_id, winner = winner_identity, "winner is not a participant");
            return Err(err.into());
        }

        let mut finished = ring.clone();
        finished.version += 1;
        finished.status = RingStatus::Finished;
        finished.winner_identity = Some(winner_identity.to_string());
        finished.seed = Some(seed.to_string());
        self.store.compare_and_swap(ring.version, finished).await?;

        tracing::info!(%ring_id, winner = winner_identity, pot = ring.total_pot, "ring finished");
        self.store.get(ring_id).await
    }

    pub async fn get_ring(&self, ring_id: Uuid) -> RingResult<RingSnapshot> {
        self.store.get(ring_id).await
    }

    pub async fn list_rings(&self, filter: &RingFilter) -> RingResult<Vec<RingSnapshot>> {
        self.store.list(filter).await
    }

    /// Charge through the gate with the configured timeout. No ring state
    /// has been touched at this point, so every failure mode is terminal for
    /// the attempt and leaves the ring unchanged.
    async fn charge(&self, amount: f64, identity: &str) -> RingResult<Receipt> {
        let timeout = self.settings.payment_timeout();
        match tokio::time::timeout(timeout, self.gate.pay(amount, identity)).await {
            Ok(Ok(receipt)) => Ok(receipt),
            Ok(Err(declined)) => Err(RingError::PaymentRejected {
                reason: declined.to_string(),
            }),
            Err(_) => Err(RingError::PaymentRejected {
                reason: format!("payment gate gave no outcome within {:?}", timeout),
            }),
        }
    }

    /// Refund a receipt whose admission write failed. A failed refund leaves
    /// an orphaned receipt, which operators must reconcile; it is logged at
    /// error level for that reason.
    async fn compensate(&self, receipt: &Receipt) {
        if let Err(err) = self.gate.refund(receipt).await {
            tracing::error!(
                reference = %receipt.reference,
                error = %err,
                "refund failed; receipt orphaned"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::AutoApproveGate;
    use crate::store::MemoryRingStore;

    fn engine() -> RingEngine {
        let settings = EngineSettings {
            payment_timeout_ms: 1_000,
            spin_delay_ms: 0,
        };
        RingEngine::new(
            Arc::new(MemoryRingStore::new()),
            Arc::new(AutoApproveGate::new()),
            settings,
        )
    }

    #[tokio::test]
    async fn test_create_rejects_non_positive_buy_in() {
        let engine = engine();
        for buy_in in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = engine
                .create_ring("alice", "Alice", buy_in, 4, false)
                .await
                .unwrap_err();
            assert!(matches!(err, RingError::InvalidParameter(_)), "{}", buy_in);
        }
    }

    #[tokio::test]
    async fn test_create_rejects_small_max_participants() {
        let engine = engine();
        let err = engine
            .create_ring("alice", "Alice", 10.0, 1, false)
            .await
            .unwrap_err();
        assert!(matches!(err, RingError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_create_auto_admits_creator() {
        let engine = engine();
        let snapshot = engine
            .create_ring("alice", "Alice", 10.0, 4, false)
            .await
            .unwrap();

        assert_eq!(snapshot.ring.status, RingStatus::Waiting);
        assert_eq!(snapshot.ring.current_participants, 1);
        assert_eq!(snapshot.ring.total_pot, 10.0);
        assert_eq!(snapshot.participants.len(), 1);
        assert_eq!(snapshot.participants[0].identity, "alice");
        assert!(!snapshot.ring.seed_commitment.is_empty());
        assert!(snapshot.ring.seed.is_none());
    }

    #[tokio::test]
    async fn test_second_join_activates_ring() {
        let engine = engine();
        let snapshot = engine
            .create_ring("alice", "Alice", 10.0, 4, false)
            .await
            .unwrap();

        engine
            .join_ring(snapshot.ring.id, "bob", "Bob", false)
            .await
            .unwrap();

        let ring = engine.get_ring(snapshot.ring.id).await.unwrap().ring;
        assert_eq!(ring.status, RingStatus::Active);
        assert_eq!(ring.current_participants, 2);
        assert_eq!(ring.total_pot, 20.0);
    }

    #[tokio::test]
    async fn test_duplicate_identity_rejected_before_payment() {
        let engine = engine();
        let snapshot = engine
            .create_ring("alice", "Alice", 10.0, 4, false)
            .await
            .unwrap();

        let err = engine
            .join_ring(snapshot.ring.id, "alice", "Alice", false)
            .await
            .unwrap_err();
        assert!(matches!(err, RingError::AlreadyJoined { .. }));
    }
}
