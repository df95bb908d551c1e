//! Listing and record enums.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// Closed set of listing categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingCategory {
    TradingBot,
    ApiTool,
    Script,
    Custom,
}

impl ListingCategory {
    pub const ALL: [ListingCategory; 4] = [
        ListingCategory::TradingBot,
        ListingCategory::ApiTool,
        ListingCategory::Script,
        ListingCategory::Custom,
    ];

    /// Display label, which is also the wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingCategory::TradingBot => "Trading Bot",
            ListingCategory::ApiTool => "API Tool",
            ListingCategory::Script => "Script",
            ListingCategory::Custom => "Custom",
        }
    }

    pub fn parse(s: &str) -> Result<Self, TypesError> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| TypesError::UnknownCategory(s.to_string()))
    }
}

impl fmt::Display for ListingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Admin-assigned risk label. Independent of the lifecycle status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    #[default]
    Standard,
    HighRisk,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Standard => "standard",
            RiskLevel::HighRisk => "high-risk",
        }
    }

    pub fn parse(s: &str) -> Result<Self, TypesError> {
        match s {
            "standard" => Ok(RiskLevel::Standard),
            "high-risk" => Ok(RiskLevel::HighRisk),
            other => Err(TypesError::UnknownRiskLevel(other.to_string())),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a listing.
///
/// The wire format still speaks the legacy `(state, approved)` pair; it is
/// derived from this enum so that `on_market` without approval cannot exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingStatus {
    /// Submitted, waiting for moderation.
    PendingReview,
    /// Approved and on market. The only purchasable status.
    Live,
    /// Taken off the market by an admin or its seller.
    Pulled,
}

impl ListingStatus {
    pub fn is_purchasable(&self) -> bool {
        matches!(self, ListingStatus::Live)
    }

    /// Legacy `state` value.
    pub fn state_str(&self) -> &'static str {
        match self {
            ListingStatus::PendingReview => "in_review",
            ListingStatus::Live => "on_market",
            ListingStatus::Pulled => "pulled",
        }
    }

    /// Legacy `approved` flag.
    pub fn approved(&self) -> bool {
        matches!(self, ListingStatus::Live)
    }

    /// Rebuild from the legacy pair, rejecting combinations that were never valid.
    pub fn from_parts(state: &str, approved: bool) -> Result<Self, TypesError> {
        match (state, approved) {
            ("in_review", false) => Ok(ListingStatus::PendingReview),
            ("on_market", true) => Ok(ListingStatus::Live),
            ("pulled", _) => Ok(ListingStatus::Pulled),
            _ => Err(TypesError::InvalidState {
                state: state.to_string(),
                approved,
            }),
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ListingStatus::PendingReview => "pending-review",
            ListingStatus::Live => "live",
            ListingStatus::Pulled => "pulled",
        };
        f.write_str(label)
    }
}

/// Outcome stored on a transaction record.
///
/// Settlement only ever writes `Success`: a payment that fails verification
/// is counted on the listing and logged, but creates no transaction, so its
/// reference stays free for a retry. `Failed` completes the persisted status
/// set so records written by other tooling still decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
        }
    }
}

/// Audit log categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogKind {
    AdminLogin,
    AdminFail,
    ListingSubmitted,
    ListingModerated,
    Purchase,
    PurchaseFailed,
    FraudAttempt,
    Report,
    Error,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::AdminLogin => "admin_login",
            LogKind::AdminFail => "admin_fail",
            LogKind::ListingSubmitted => "listing_submitted",
            LogKind::ListingModerated => "listing_moderated",
            LogKind::Purchase => "purchase",
            LogKind::PurchaseFailed => "purchase_failed",
            LogKind::FraudAttempt => "fraud_attempt",
            LogKind::Report => "report",
            LogKind::Error => "error",
        }
    }

    /// Only these kinds may carry the caller's ip address.
    pub fn records_ip(&self) -> bool {
        matches!(self, LogKind::AdminFail | LogKind::FraudAttempt)
    }
}
