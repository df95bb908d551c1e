//! User storage trait.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use souk_types::{Timestamp, WalletAddress};

/// Per-wallet access state, refreshed on every connect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub wallet: WalletAddress,
    pub has_accepted_tos: bool,
    pub tos_accepted_at: Option<Timestamp>,
    /// Result of the last token-gating check.
    pub is_token_gated: bool,
    /// Last observed gating-token balance (UI units).
    pub token_balance: f64,
    pub last_seen: Timestamp,
    pub created_at: Timestamp,
}

impl UserRecord {
    /// A user seen for the first time.
    pub fn new(wallet: WalletAddress, now: Timestamp) -> Self {
        Self {
            wallet,
            has_accepted_tos: false,
            tos_accepted_at: None,
            is_token_gated: false,
            token_balance: 0.0,
            last_seen: now,
            created_at: now,
        }
    }
}

/// Trait for user storage operations.
pub trait UserStore: Send + Sync {
    fn get_user(&self, wallet: &WalletAddress) -> Result<Option<UserRecord>, StoreError>;

    /// Atomic read-modify-write of one user.
    ///
    /// `apply` receives the stored record (or `None` for an unseen wallet) and
    /// returns the record to persist, which is also returned to the caller.
    fn update_user(
        &self,
        wallet: &WalletAddress,
        apply: &mut dyn FnMut(Option<UserRecord>) -> UserRecord,
    ) -> Result<UserRecord, StoreError>;

    fn user_count(&self) -> Result<u64, StoreError>;
}
