//! Read-side projection of a listing.

use serde::Serialize;
use souk_store::ListingRecord;
use souk_types::ListingStatus;

/// What callers see of a listing. Carries no delivery payload; that only
/// leaves the market inside a purchase receipt.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingView {
    pub id: String,
    pub wallet: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whitepaper_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    /// Price in USDC.
    pub price: f64,
    pub category: &'static str,
    pub risk_level: &'static str,
    pub state: &'static str,
    pub approved: bool,
    pub reports_count: u32,
    pub failed_purchase_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure_at: Option<u64>,
    pub created_at: u64,
    pub updated_at: u64,
    #[serde(skip)]
    pub status: ListingStatus,
}

impl From<&ListingRecord> for ListingView {
    fn from(l: &ListingRecord) -> Self {
        Self {
            id: l.id.to_hex(),
            wallet: l.wallet.to_string(),
            title: l.title.clone(),
            description: l.description.clone(),
            image_url: l.image_url.clone(),
            demo_video_url: l.demo_video_url.clone(),
            whitepaper_url: l.whitepaper_url.clone(),
            github_url: l.github_url.clone(),
            price: l.price.as_f64(),
            category: l.category.as_str(),
            risk_level: l.risk_level.as_str(),
            state: l.status.state_str(),
            approved: l.status.approved(),
            reports_count: l.reports_count,
            failed_purchase_count: l.failed_purchase_count,
            last_failure_at: l.last_failure_at.map(|t| t.as_secs()),
            created_at: l.created_at.as_secs(),
            updated_at: l.updated_at.as_secs(),
            status: l.status,
        }
    }
}

impl From<ListingRecord> for ListingView {
    fn from(l: ListingRecord) -> Self {
        Self::from(&l)
    }
}
