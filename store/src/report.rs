//! Abuse report storage trait.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use souk_types::{ListingId, ReportId, Timestamp, WalletAddress};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub id: ReportId,
    pub listing_id: ListingId,
    pub reporter_wallet: WalletAddress,
    pub reason: Option<String>,
    pub created_at: Timestamp,
}

/// Trait for report storage. Reports are unique per `(listing, reporter)`.
pub trait ReportStore: Send + Sync {
    /// Insert a report and bump the listing's `reports_count`, as one write.
    ///
    /// Fails with `NotFound` if the listing is gone and `Duplicate` if this
    /// reporter already reported it; a failure writes nothing. The listing's
    /// `updated_at` becomes the report's `created_at` and its `version` is
    /// bumped. Returns the new report count.
    fn insert_report(&self, report: &ReportRecord) -> Result<u32, StoreError>;

    fn reports_for_listing(&self, listing_id: &ListingId) -> Result<Vec<ReportRecord>, StoreError>;
}
