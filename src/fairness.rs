//! Deterministic, auditable winner selection.
//!
//! The draw is a pure function of the ordered participant list and a seed:
//! SHA-256 the seed, reduce the digest to a fraction in [0, 1), scale by the
//! participant count, floor to an index. Identical inputs always select the
//! identical winner, so any participant can re-run the draw after the seed is
//! revealed.
//!
//! The seed is generated server-side when the ring is created, before
//! admission can close, and only its SHA-256 commitment is published until
//! the ring finishes. Commit-then-reveal is what makes the draw provably
//! fair: no participant can predict the outcome, and the server cannot swap
//! the seed after the fact without breaking the commitment.

use crate::rings::types::Participant;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generate a fresh fairness seed: 32 random bytes, hex-encoded.
pub fn generate_seed() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hex SHA-256 commitment for a seed, published before admission closes.
pub fn commitment_for(seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hex::encode(hasher.finalize())
}

/// Reduce a seed to a fraction in [0, 1) via a fixed deterministic transform.
pub fn normalized_fraction(seed: &str) -> f64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    let digest = hasher.finalize();

    let mut raw = [0u8; 8];
    raw.copy_from_slice(&digest[..8]);
    // Keep 53 bits so the quotient is exact in f64 and strictly below 1.
    let x = u64::from_be_bytes(raw) >> 11;
    x as f64 / (1u64 << 53) as f64
}

/// Select the winner for an ordered participant list and a seed.
///
/// Pure and deterministic. Callers guarantee at least two participants;
/// selection by index means ties cannot occur.
pub fn select_winner<'a>(participants: &'a [Participant], seed: &str) -> &'a Participant {
    debug_assert!(participants.len() >= 2);

    let fraction = normalized_fraction(seed);
    let index = ((fraction * participants.len() as f64) as usize).min(participants.len() - 1);
    &participants[index]
}

/// Re-run a finished ring's draw and check it against the published
/// commitment and recorded winner.
pub fn verify_selection(
    participants: &[Participant],
    seed: &str,
    commitment: &str,
    winner_identity: &str,
) -> bool {
    if commitment_for(seed) != commitment {
        return false;
    }
    if participants.len() < 2 {
        return false;
    }
    select_winner(participants, seed).identity == winner_identity
}
