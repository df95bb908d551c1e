//! Collaborators that talk to the payment network.
//!
//! The marketplace never inspects the chain itself. It asks two questions,
//! each behind a trait so tests and mock deployments can answer them without
//! a node:
//! - [`BalanceOracle`]: how many gating tokens does a wallet hold?
//! - [`PaymentVerifier`]: did the settlement with this reference succeed?
//!
//! [`RpcBalanceOracle`] and [`RpcPaymentVerifier`] answer over JSON-RPC.
//! [`FixedBalanceOracle`] and [`TrustingVerifier`] are for mock mode.

pub mod error;
pub mod fixed;
pub mod rpc;

use async_trait::async_trait;
use souk_types::WalletAddress;

pub use error::ChainError;
pub use fixed::{FixedBalanceOracle, TrustingVerifier};
pub use rpc::{RpcBalanceOracle, RpcClient, RpcPaymentVerifier};

/// Answers token-balance queries for the access gate.
#[async_trait]
pub trait BalanceOracle: Send + Sync {
    /// Gating-token balance of `wallet` in UI units (decimals applied).
    async fn balance_of(&self, wallet: &WalletAddress) -> Result<f64, ChainError>;
}

/// Confirms that a payment reference names a successful settlement.
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    async fn verify(&self, reference: &str) -> Result<bool, ChainError>;
}
