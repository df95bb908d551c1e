//! Nullable payment-network collaborators.

use async_trait::async_trait;
use souk_chain::{BalanceOracle, ChainError, PaymentVerifier};
use souk_types::WalletAddress;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// A balance oracle answering from a table, with a default for unknown wallets.
pub struct NullBalanceOracle {
    default_balance: f64,
    balances: Mutex<HashMap<WalletAddress, f64>>,
    offline: AtomicBool,
}

impl NullBalanceOracle {
    pub fn new(default_balance: f64) -> Self {
        Self {
            default_balance,
            balances: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    pub fn set_balance(&self, wallet: &WalletAddress, balance: f64) {
        self.balances.lock().unwrap().insert(wallet.clone(), balance);
    }

    /// While offline, every query fails with `Unreachable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl BalanceOracle for NullBalanceOracle {
    async fn balance_of(&self, wallet: &WalletAddress) -> Result<f64, ChainError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ChainError::Unreachable("null oracle is offline".into()));
        }
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(wallet)
            .copied()
            .unwrap_or(self.default_balance))
    }
}

/// A payment verifier that confirms a configured set of references (or every
/// reference when built with [`NullPaymentVerifier::accept_all`]), and counts
/// how often it was asked.
pub struct NullPaymentVerifier {
    accept_all: bool,
    confirmed: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl NullPaymentVerifier {
    pub fn accept_all() -> Self {
        Self {
            accept_all: true,
            confirmed: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Reject everything except references passed to [`Self::confirm`].
    pub fn reject_all() -> Self {
        Self {
            accept_all: false,
            ..Self::accept_all()
        }
    }

    pub fn confirm(&self, reference: &str) {
        self.confirmed.lock().unwrap().insert(reference.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentVerifier for NullPaymentVerifier {
    async fn verify(&self, reference: &str) -> Result<bool, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.accept_all || self.confirmed.lock().unwrap().contains(reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet() -> WalletAddress {
        WalletAddress::parse("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM").unwrap()
    }

    #[tokio::test]
    async fn oracle_table_and_default() {
        let oracle = NullBalanceOracle::new(0.0);
        assert_eq!(oracle.balance_of(&wallet()).await.unwrap(), 0.0);
        oracle.set_balance(&wallet(), 250_000.0);
        assert_eq!(oracle.balance_of(&wallet()).await.unwrap(), 250_000.0);
        oracle.set_offline(true);
        assert!(oracle.balance_of(&wallet()).await.is_err());
    }

    #[tokio::test]
    async fn verifier_confirms_and_counts() {
        let verifier = NullPaymentVerifier::reject_all();
        assert!(!verifier.verify("sig-1").await.unwrap());
        verifier.confirm("sig-1");
        assert!(verifier.verify("sig-1").await.unwrap());
        assert_eq!(verifier.calls(), 2);
        assert!(NullPaymentVerifier::accept_all().verify("x").await.unwrap());
    }
}
