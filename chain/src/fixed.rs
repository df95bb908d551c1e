//! Network-free collaborators for mock deployments.

use async_trait::async_trait;
use souk_types::WalletAddress;

use crate::{BalanceOracle, ChainError, PaymentVerifier};

/// Reports the same balance for every wallet.
#[derive(Clone, Copy, Debug)]
pub struct FixedBalanceOracle {
    balance: f64,
}

impl FixedBalanceOracle {
    pub fn new(balance: f64) -> Self {
        Self { balance }
    }
}

#[async_trait]
impl BalanceOracle for FixedBalanceOracle {
    async fn balance_of(&self, _wallet: &WalletAddress) -> Result<f64, ChainError> {
        Ok(self.balance)
    }
}

/// Accepts every payment reference.
///
/// Only for development against a mock chain; reference uniqueness is still
/// enforced by the store.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrustingVerifier;

#[async_trait]
impl PaymentVerifier for TrustingVerifier {
    async fn verify(&self, reference: &str) -> Result<bool, ChainError> {
        tracing::debug!(reference, "payment accepted without verification");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_answers() {
        let wallet = WalletAddress::parse("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU").unwrap();
        assert_eq!(
            FixedBalanceOracle::new(1_000.0).balance_of(&wallet).await.unwrap(),
            1_000.0
        );
        assert!(TrustingVerifier.verify("sig").await.unwrap());
    }
}
