//! Listing storage trait.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use souk_types::{
    ListingCategory, ListingId, ListingStatus, RiskLevel, Timestamp, UsdcAmount, WalletAddress,
};

/// A persisted listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub id: ListingId,
    /// Seller wallet; the only wallet allowed to withdraw or delete.
    pub wallet: WalletAddress,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub demo_video_url: Option<String>,
    pub whitepaper_url: Option<String>,
    pub github_url: Option<String>,
    /// Sealed delivery payload. Never leaves the store in plaintext.
    pub delivery_payload: Vec<u8>,
    pub price: UsdcAmount,
    pub category: ListingCategory,
    pub risk_level: RiskLevel,
    pub status: ListingStatus,
    pub reports_count: u32,
    pub failed_purchase_count: u32,
    pub last_failure_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Bumped on every write; the compare-and-swap token.
    pub version: u64,
}

impl ListingRecord {
    pub fn is_purchasable(&self) -> bool {
        self.status.is_purchasable()
    }
}

/// Trait for listing storage operations.
pub trait ListingStore: Send + Sync {
    /// Insert a new listing. Fails with `Duplicate` if the id is taken.
    fn insert_listing(&self, listing: &ListingRecord) -> Result<(), StoreError>;

    fn get_listing(&self, id: &ListingId) -> Result<ListingRecord, StoreError>;

    /// Replace a listing if its stored version still equals `expected_version`.
    ///
    /// Fails with `NotFound` if the listing is gone and `Conflict` if another
    /// writer got there first.
    fn compare_and_swap(
        &self,
        expected_version: u64,
        listing: &ListingRecord,
    ) -> Result<(), StoreError>;

    /// Remove a listing together with every report filed against it.
    fn delete_listing(&self, id: &ListingId) -> Result<(), StoreError>;

    fn iter_listings(&self) -> Result<Vec<ListingRecord>, StoreError>;

    fn listing_count(&self) -> Result<u64, StoreError> {
        self.iter_listings().map(|v| v.len() as u64)
    }

    fn listings_by_wallet(&self, wallet: &WalletAddress) -> Result<Vec<ListingRecord>, StoreError> {
        Ok(self
            .iter_listings()?
            .into_iter()
            .filter(|l| &l.wallet == wallet)
            .collect())
    }

    fn live_listings(&self) -> Result<Vec<ListingRecord>, StoreError> {
        Ok(self
            .iter_listings()?
            .into_iter()
            .filter(|l| l.is_purchasable())
            .collect())
    }
}
