//! Wallet access gate: token-balance gating plus terms-of-service acceptance.

use std::sync::Arc;

use serde::Serialize;
use souk_chain::BalanceOracle;
use souk_store::{MarketStore, UserRecord, UserStore};
use souk_types::{Clock, WalletAddress};

use crate::validation::parse_wallet;
use crate::MarketError;

/// Result of a wallet connect.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessStatus {
    pub wallet: String,
    pub token_gating_passed: bool,
    #[serde(rename = "hasAcceptedTOS")]
    pub has_accepted_tos: bool,
    pub token_balance: f64,
}

impl From<&UserRecord> for AccessStatus {
    fn from(user: &UserRecord) -> Self {
        Self {
            wallet: user.wallet.to_string(),
            token_gating_passed: user.is_token_gated,
            has_accepted_tos: user.has_accepted_tos,
            token_balance: user.token_balance,
        }
    }
}

#[derive(Clone)]
pub struct AccessGate {
    store: Arc<dyn MarketStore>,
    oracle: Arc<dyn BalanceOracle>,
    clock: Arc<dyn Clock>,
    min_token_balance: f64,
}

impl AccessGate {
    pub fn new(
        store: Arc<dyn MarketStore>,
        oracle: Arc<dyn BalanceOracle>,
        clock: Arc<dyn Clock>,
        min_token_balance: f64,
    ) -> Self {
        Self {
            store,
            oracle,
            clock,
            min_token_balance,
        }
    }

    /// Query the wallet's gating-token balance and refresh the stored user.
    pub async fn check_access(&self, wallet: &str) -> Result<AccessStatus, MarketError> {
        let wallet = parse_wallet(wallet)?;
        let balance = self.oracle.balance_of(&wallet).await?;
        let passed = balance >= self.min_token_balance;
        let now = self.clock.now();

        let user = self.store.update_user(&wallet, &mut |stored| {
            let mut user = stored.unwrap_or_else(|| UserRecord::new(wallet.clone(), now));
            user.is_token_gated = passed;
            user.token_balance = balance;
            user.last_seen = now;
            user
        })?;

        tracing::info!(
            operation = "check_access",
            wallet = wallet.short(),
            balance,
            passed,
            "wallet connected"
        );
        Ok(AccessStatus::from(&user))
    }

    pub fn accept_tos(&self, wallet: &str) -> Result<AccessStatus, MarketError> {
        let wallet = parse_wallet(wallet)?;
        let now = self.clock.now();
        let user = self.store.update_user(&wallet, &mut |stored| {
            let mut user = stored.unwrap_or_else(|| UserRecord::new(wallet.clone(), now));
            user.has_accepted_tos = true;
            user.tos_accepted_at = Some(now);
            user.last_seen = now;
            user
        })?;
        tracing::info!(operation = "accept_tos", wallet = wallet.short(), "terms accepted");
        Ok(AccessStatus::from(&user))
    }

    /// Clear any earlier acceptance so the next connect prompts again.
    pub fn decline_tos(&self, wallet: &str) -> Result<AccessStatus, MarketError> {
        let wallet = parse_wallet(wallet)?;
        let now = self.clock.now();
        let user = self.store.update_user(&wallet, &mut |stored| {
            let mut user = stored.unwrap_or_else(|| UserRecord::new(wallet.clone(), now));
            user.has_accepted_tos = false;
            user.tos_accepted_at = None;
            user.last_seen = now;
            user
        })?;
        tracing::info!(operation = "decline_tos", wallet = wallet.short(), "terms declined");
        Ok(AccessStatus::from(&user))
    }

    /// Succeeds only for a known wallet that passed gating and accepted terms.
    pub fn authorize(&self, wallet: &str) -> Result<WalletAddress, MarketError> {
        let wallet = parse_wallet(wallet)?;
        match self.store.get_user(&wallet)? {
            Some(user) if user.is_token_gated && user.has_accepted_tos => Ok(wallet),
            Some(user) if !user.is_token_gated => Err(MarketError::AccessDenied(
                "insufficient gating token balance".into(),
            )),
            Some(_) => Err(MarketError::AccessDenied(
                "terms of service not accepted".into(),
            )),
            None => Err(MarketError::AccessDenied("wallet has not connected".into())),
        }
    }
}
