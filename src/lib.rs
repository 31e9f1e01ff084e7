//! Ringpot - Pooled-Wager Ring Engine
//!
//! A ring is a pooled-wager session: participants each contribute an equal
//! buy-in toward one pot, and a fairness-verifiable draw awards the pot to
//! exactly one winner. The crate provides the lifecycle state machine,
//! admission control with pot accounting, deterministic commit-reveal winner
//! selection, and a real-time event feed, all correct under concurrent
//! untrusted requests via per-ring optimistic concurrency.
//!
//! Custody of funds is external: the engine consumes a [`payment::PaymentGate`]
//! and treats its receipts as opaque.

pub mod api;
pub mod config;
pub mod errors;
pub mod events;
pub mod fairness;
pub mod lifecycle;
pub mod payment;
pub mod rings;
pub mod store;

pub use errors::{ConsistencyError, RingError, RingResult};
pub use lifecycle::RingEngine;
