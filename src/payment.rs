//! Payment Gate: the external capability that moves funds.
//!
//! The engine treats the gate as an opaque collaborator. Admission never
//! advances without a [`Receipt`], and a store write that fails after a
//! successful payment is compensated with a refund.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Opaque proof of a completed funds movement, attached to admission records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Receipt {
    pub reference: String,
}

/// A declined or failed payment.
#[derive(Debug, thiserror::Error)]
#[error("payment of {amount} for {identity} declined: {reason}")]
pub struct PaymentDeclined {
    pub identity: String,
    pub amount: f64,
    pub reason: String,
}

/// Interface to the external payment backend. Implementations exist per
/// backend (direct transfer, contract call, store-only); the lifecycle
/// controller is agnostic to which one is plugged in.
#[async_trait]
pub trait PaymentGate: Send + Sync {
    /// Charge `identity` the given amount, returning an opaque receipt.
    async fn pay(&self, amount: f64, identity: &str) -> Result<Receipt, PaymentDeclined>;

    /// Compensating rollback for a receipt whose admission write failed.
    async fn refund(&self, receipt: &Receipt) -> Result<(), PaymentDeclined>;
}

/// Gate that approves every payment. For development, demo rings, and tests.
pub struct AutoApproveGate {
    counter: AtomicU64,
    refunded: Mutex<Vec<String>>,
}

impl AutoApproveGate {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
            refunded: Mutex::new(Vec::new()),
        }
    }

    /// Number of payments issued so far.
    pub fn payments(&self) -> u64 {
        self.counter.load(Ordering::SeqCst) - 1
    }

    /// References of receipts refunded through this gate.
    pub fn refunded(&self) -> Vec<String> {
        self.refunded.lock().expect("refund log poisoned").clone()
    }
}

impl Default for AutoApproveGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGate for AutoApproveGate {
    async fn pay(&self, _amount: f64, identity: &str) -> Result<Receipt, PaymentDeclined> {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(Receipt {
            reference: format!("auto-{}-{}", seq, identity),
        })
    }

    async fn refund(&self, receipt: &Receipt) -> Result<(), PaymentDeclined> {
        self.refunded
            .lock()
            .expect("refund log poisoned")
            .push(receipt.reference.clone());
        Ok(())
    }
}

/// Gate that declines every payment. For tests exercising rejection paths.
pub struct DecliningGate;

#[async_trait]
impl PaymentGate for DecliningGate {
    async fn pay(&self, amount: f64, identity: &str) -> Result<Receipt, PaymentDeclined> {
        Err(PaymentDeclined {
            identity: identity.to_string(),
            amount,
            reason: "gate configured to decline".to_string(),
        })
    }

    async fn refund(&self, _receipt: &Receipt) -> Result<(), PaymentDeclined> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_auto_approve_issues_unique_receipts() {
        let gate = AutoApproveGate::new();

        let a = gate.pay(10.0, "alice").await.unwrap();
        let b = gate.pay(10.0, "bob").await.unwrap();

        assert_ne!(a.reference, b.reference);
        assert_eq!(gate.payments(), 2);
    }

    #[tokio::test]
    async fn test_refunds_are_recorded() {
        let gate = AutoApproveGate::new();
        let receipt = gate.pay(5.0, "alice").await.unwrap();

        gate.refund(&receipt).await.unwrap();

        assert_eq!(gate.refunded(), vec![receipt.reference]);
    }

    #[tokio::test]
    async fn test_declining_gate_declines() {
        let gate = DecliningGate;
        let err = gate.pay(1.0, "alice").await.unwrap_err();
        assert!(err.to_string().contains("alice"));
    }
}
