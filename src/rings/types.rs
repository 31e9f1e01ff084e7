use crate::payment::Receipt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Ring lifecycle states. Transitions are monotonic:
/// waiting -> active -> spinning -> finished.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RingStatus {
    Waiting,
    Active,
    Spinning,
    Finished,
}

impl RingStatus {
    /// Whether new participants may still be admitted.
    pub fn is_admitting(&self) -> bool {
        matches!(self, RingStatus::Waiting | RingStatus::Active)
    }
}

impl fmt::Display for RingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingStatus::Waiting => write!(f, "waiting"),
            RingStatus::Active => write!(f, "active"),
            RingStatus::Spinning => write!(f, "spinning"),
            RingStatus::Finished => write!(f, "finished"),
        }
    }
}

/// A pooled-wager session: equal buy-ins from every participant, one pot,
/// one winner.
///
/// Invariants, maintained by the lifecycle controller and checked by tests:
/// `current_participants` equals the participant list length, `total_pot`
/// equals `buy_in * current_participants`, `current_participants` never
/// exceeds `max_participants`, and `winner_identity` is set iff finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ring {
    pub id: Uuid,
    pub creator_identity: String,
    pub buy_in: f64,
    pub max_participants: u32,
    pub current_participants: u32,
    pub total_pot: f64,
    pub status: RingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_identity: Option<String>,
    /// Hex SHA-256 of the fairness seed, published from creation so the draw
    /// can be audited after the reveal.
    pub seed_commitment: String,
    /// The revealed fairness seed. Set iff status is finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
    /// Demo rings may be filled by the synthetic participant driver.
    #[serde(default)]
    pub is_demo: bool,
    /// Monotonic version counter; every mutation is a compare-and-swap on it.
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

/// An admitted identity holding one equal stake in a ring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub ring_id: Uuid,
    pub identity: String,
    pub display_label: String,
    /// True for admissions made by the demo driver rather than a real client.
    #[serde(default)]
    pub synthetic: bool,
    pub joined_at: DateTime<Utc>,
    pub payment_receipt: Receipt,
}

/// A ring together with its ordered participant list, as read at one version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingSnapshot {
    pub ring: Ring,
    /// Participants in admission order. Winner selection indexes into this.
    pub participants: Vec<Participant>,
}

impl RingSnapshot {
    pub fn contains_identity(&self, identity: &str) -> bool {
        self.participants.iter().any(|p| p.identity == identity)
    }
}

/// Filter for listing rings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RingFilter {
    pub status: Option<RingStatus>,
    pub is_demo: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admitting_states() {
        assert!(RingStatus::Waiting.is_admitting());
        assert!(RingStatus::Active.is_admitting());
        assert!(!RingStatus::Spinning.is_admitting());
        assert!(!RingStatus::Finished.is_admitting());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&RingStatus::Spinning).unwrap(),
            "\"spinning\""
        );
    }
}
