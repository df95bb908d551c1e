//! Purchase (transaction) storage trait.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use souk_types::{
    ListingId, ListingStatus, Timestamp, TransactionId, TransactionStatus, UsdcAmount,
    WalletAddress,
};

/// A recorded purchase. Immutable once written.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub listing_id: ListingId,
    pub buyer_wallet: WalletAddress,
    pub seller_wallet: WalletAddress,
    pub amount: UsdcAmount,
    /// On-chain settlement reference. Globally unique.
    pub payment_reference: String,
    /// Sealed delivery payload copied from the listing at purchase time.
    pub delivery_payload: Vec<u8>,
    pub status: TransactionStatus,
    pub created_at: Timestamp,
}

/// Everything about a purchase except the payload, which the store copies
/// from the listing inside the commit.
#[derive(Clone, Debug, PartialEq)]
pub struct PurchaseDraft {
    pub id: TransactionId,
    pub listing_id: ListingId,
    pub buyer_wallet: WalletAddress,
    pub seller_wallet: WalletAddress,
    pub amount: UsdcAmount,
    pub payment_reference: String,
    pub created_at: Timestamp,
}

impl PurchaseDraft {
    pub fn into_record(self, delivery_payload: Vec<u8>) -> TransactionRecord {
        TransactionRecord {
            id: self.id,
            listing_id: self.listing_id,
            buyer_wallet: self.buyer_wallet,
            seller_wallet: self.seller_wallet,
            amount: self.amount,
            payment_reference: self.payment_reference,
            delivery_payload,
            status: TransactionStatus::Success,
            created_at: self.created_at,
        }
    }
}

/// Outcome of [`TransactionStore::commit_purchase`].
#[derive(Clone, Debug, PartialEq)]
pub enum PurchaseCommit {
    /// A new transaction was appended.
    Recorded(TransactionRecord),
    /// The payment reference was already recorded; nothing was written.
    Duplicate(TransactionRecord),
    /// The listing was not Live at commit time; nothing was written.
    NotPurchasable(ListingStatus),
}

/// Trait for transaction storage operations.
pub trait TransactionStore: Send + Sync {
    /// Atomically settle a purchase.
    ///
    /// In one write unit: load the listing (`NotFound` if absent), require it
    /// to be Live, require the payment reference to be unused, then append the
    /// transaction with the listing's current sealed payload.
    fn commit_purchase(&self, draft: &PurchaseDraft) -> Result<PurchaseCommit, StoreError>;

    fn get_transaction(&self, id: &TransactionId) -> Result<TransactionRecord, StoreError>;

    fn find_by_reference(&self, reference: &str) -> Result<Option<TransactionRecord>, StoreError>;

    fn iter_transactions(&self) -> Result<Vec<TransactionRecord>, StoreError>;

    fn transaction_count(&self) -> Result<u64, StoreError> {
        self.iter_transactions().map(|v| v.len() as u64)
    }

    fn transactions_by_buyer(
        &self,
        buyer: &WalletAddress,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        Ok(self
            .iter_transactions()?
            .into_iter()
            .filter(|t| &t.buyer_wallet == buyer)
            .collect())
    }
}
