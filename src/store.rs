//! Ring Store: the single owner of persisted ring and participant state.
//!
//! Every mutation is conditioned on the ring's version counter, so all
//! operations on one ring observe a single total order (the version
//! sequence). Change events are emitted while the ring's entry lock is held,
//! which makes the feed arrive in per-ring commit order.

use crate::errors::{RingError, RingResult};
use crate::rings::types::{Participant, Ring, RingFilter, RingSnapshot};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

const CHANGE_FEED_CAPACITY: usize = 1024;

/// Entity kind carried by a change event.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Ring,
    Participant,
}

/// Commit operation carried by a change event.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreOp {
    Insert,
    Update,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StorePayload {
    Ring(Ring),
    Participant(Participant),
}

/// Change notification for one committed entity write.
#[derive(Debug, Clone, Serialize)]
pub struct StoreEvent {
    pub entity: EntityKind,
    pub op: StoreOp,
    pub ring_id: Uuid,
    /// Ring version at commit time. Subscribers detect gaps by watching for
    /// jumps and re-fetch authoritative state.
    pub version: u64,
    pub payload: StorePayload,
}

/// Storage interface for rings and participants.
#[async_trait]
pub trait RingStore: Send + Sync {
    /// Insert a new ring with its creator as participant 1.
    async fn insert(&self, ring: Ring, seed: String, creator: Participant) -> RingResult<()>;

    /// Read a ring with its ordered participant list.
    async fn get(&self, ring_id: Uuid) -> RingResult<RingSnapshot>;

    /// List rings matching a filter, newest first.
    async fn list(&self, filter: &RingFilter) -> RingResult<Vec<RingSnapshot>>;

    /// Replace a ring iff its stored version equals `expected_version`.
    /// `ring.version` must be `expected_version + 1`.
    async fn compare_and_swap(&self, expected_version: u64, ring: Ring) -> RingResult<()>;

    /// Compare-and-swap the ring and append a participant in one commit,
    /// enforcing (ring_id, identity) uniqueness.
    async fn admit(
        &self,
        expected_version: u64,
        ring: Ring,
        participant: Participant,
    ) -> RingResult<()>;

    /// The fairness seed persisted at creation. Store-private until reveal.
    async fn fairness_seed(&self, ring_id: Uuid) -> RingResult<String>;

    /// Subscribe to the change feed.
    fn watch(&self) -> broadcast::Receiver<StoreEvent>;
}

struct StoredRing {
    ring: Ring,
    seed: String,
    participants: Vec<Participant>,
}

/// In-process store over a concurrent map. Entry locks give per-ring
/// atomicity; there is no lock shared across rings.
pub struct MemoryRingStore {
    rings: DashMap<Uuid, StoredRing>,
    feed: broadcast::Sender<StoreEvent>,
}

impl MemoryRingStore {
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            rings: DashMap::new(),
            feed,
        }
    }

    fn emit(&self, event: StoreEvent) {
        // A send error only means no subscriber is connected.
        let _ = self.feed.send(event);
    }

    fn check_version(stored: &StoredRing, expected_version: u64, ring: &Ring) -> RingResult<()> {
        if stored.ring.version != expected_version {
            return Err(RingError::Conflict {
                ring_id: ring.id,
                expected_version,
                actual_version: stored.ring.version,
            });
        }
        if ring.version != expected_version + 1 {
            return Err(RingError::InvalidParameter(format!(
                "ring version must advance from {} to {}, got {}",
                expected_version,
                expected_version + 1,
                ring.version
            )));
        }
        Ok(())
    }
}

impl Default for MemoryRingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RingStore for MemoryRingStore {
    async fn insert(&self, ring: Ring, seed: String, creator: Participant) -> RingResult<()> {
        let ring_id = ring.id;
        match self.rings.entry(ring_id) {
            Entry::Occupied(_) => Err(RingError::InvalidParameter(format!(
                "ring {} already exists",
                ring_id
            ))),
            Entry::Vacant(slot) => {
                let version = ring.version;
                let ring_event = StoreEvent {
                    entity: EntityKind::Ring,
                    op: StoreOp::Insert,
                    ring_id,
                    version,
                    payload: StorePayload::Ring(ring.clone()),
                };
                let participant_event = StoreEvent {
                    entity: EntityKind::Participant,
                    op: StoreOp::Insert,
                    ring_id,
                    version,
                    payload: StorePayload::Participant(creator.clone()),
                };

                // Emit before releasing the entry guard so a racing write on
                // the new ring cannot publish ahead of the inserts.
                let guard = slot.insert(StoredRing {
                    ring,
                    seed,
                    participants: vec![creator],
                });
                self.emit(ring_event);
                self.emit(participant_event);
                drop(guard);
                Ok(())
            }
        }
    }

    async fn get(&self, ring_id: Uuid) -> RingResult<RingSnapshot> {
        let stored = self
            .rings
            .get(&ring_id)
            .ok_or(RingError::NotFound { ring_id })?;

        Ok(RingSnapshot {
            ring: stored.ring.clone(),
            participants: stored.participants.clone(),
        })
    }

    async fn list(&self, filter: &RingFilter) -> RingResult<Vec<RingSnapshot>> {
        let mut snapshots: Vec<RingSnapshot> = self
            .rings
            .iter()
            .filter(|entry| {
                let ring = &entry.ring;
                filter.status.map_or(true, |s| ring.status == s)
                    && filter.is_demo.map_or(true, |d| ring.is_demo == d)
            })
            .map(|entry| RingSnapshot {
                ring: entry.ring.clone(),
                participants: entry.participants.clone(),
            })
            .collect();

        snapshots.sort_by(|a, b| b.ring.created_at.cmp(&a.ring.created_at));
        Ok(snapshots)
    }

    async fn compare_and_swap(&self, expected_version: u64, ring: Ring) -> RingResult<()> {
        let ring_id = ring.id;
        let mut stored = self
            .rings
            .get_mut(&ring_id)
            .ok_or(RingError::NotFound { ring_id })?;

        Self::check_version(&stored, expected_version, &ring)?;

        let event = StoreEvent {
            entity: EntityKind::Ring,
            op: StoreOp::Update,
            ring_id,
            version: ring.version,
            payload: StorePayload::Ring(ring.clone()),
        };
        stored.ring = ring;
        self.emit(event);
        Ok(())
    }

    async fn admit(
        &self,
        expected_version: u64,
        ring: Ring,
        participant: Participant,
    ) -> RingResult<()> {
        let ring_id = ring.id;
        let mut stored = self
            .rings
            .get_mut(&ring_id)
            .ok_or(RingError::NotFound { ring_id })?;

        Self::check_version(&stored, expected_version, &ring)?;

        if stored
            .participants
            .iter()
            .any(|p| p.identity == participant.identity)
        {
            return Err(RingError::AlreadyJoined {
                ring_id,
                identity: participant.identity,
            });
        }

        let version = ring.version;
        let ring_event = StoreEvent {
            entity: EntityKind::Ring,
            op: StoreOp::Update,
            ring_id,
            version,
            payload: StorePayload::Ring(ring.clone()),
        };
        let participant_event = StoreEvent {
            entity: EntityKind::Participant,
            op: StoreOp::Insert,
            ring_id,
            version,
            payload: StorePayload::Participant(participant.clone()),
        };

        stored.ring = ring;
        stored.participants.push(participant);
        self.emit(ring_event);
        self.emit(participant_event);
        Ok(())
    }

    async fn fairness_seed(&self, ring_id: Uuid) -> RingResult<String> {
        let stored = self
            .rings
            .get(&ring_id)
            .ok_or(RingError::NotFound { ring_id })?;
        Ok(stored.seed.clone())
    }

    fn watch(&self) -> broadcast::Receiver<StoreEvent> {
        self.feed.subscribe()
    }
}
