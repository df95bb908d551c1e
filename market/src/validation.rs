//! Input validation for listing submissions, purchases and reports.
//!
//! Checks run in a fixed order and the first failure is reported.

use serde::Deserialize;
use souk_types::{ListingCategory, UsdcAmount, WalletAddress};

use crate::MarketError;

pub const TITLE_MIN_CHARS: usize = 5;
pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MIN_CHARS: usize = 50;
pub const DESCRIPTION_MAX_CHARS: usize = 2000;
/// Lowest accepted listing price: 0.10 USDC.
pub const MIN_PRICE: UsdcAmount = UsdcAmount::from_micros(100_000);
pub const REPORT_REASON_MAX_CHARS: usize = 100;
pub const PAYMENT_REFERENCE_MAX_CHARS: usize = 128;

/// A seller's listing submission, as received.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitListing {
    pub wallet: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    #[serde(default)]
    pub demo_video_url: Option<String>,
    #[serde(default)]
    pub whitepaper_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    pub price: f64,
    pub category: String,
    /// The secret disclosed to buyers. Also accepted as `deliveryUrl`.
    #[serde(alias = "deliveryUrl")]
    pub delivery_payload: String,
}

/// A submission that passed every check, with sanitised text.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidListing {
    pub wallet: WalletAddress,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub demo_video_url: Option<String>,
    pub whitepaper_url: Option<String>,
    pub github_url: Option<String>,
    pub price: UsdcAmount,
    pub category: ListingCategory,
    pub delivery_payload: String,
}

impl SubmitListing {
    pub fn validate(&self) -> Result<ValidListing, MarketError> {
        let wallet = parse_wallet(&self.wallet)?;

        let title = sanitize_text(&self.title);
        check_length("title", &title, TITLE_MIN_CHARS, TITLE_MAX_CHARS)?;

        let description = sanitize_text(&self.description);
        check_length(
            "description",
            &description,
            DESCRIPTION_MIN_CHARS,
            DESCRIPTION_MAX_CHARS,
        )?;

        let price = UsdcAmount::from_f64(self.price)
            .map_err(|e| MarketError::Validation(format!("price: {e}")))?;
        if price < MIN_PRICE {
            return Err(MarketError::Validation(format!(
                "price must be at least {MIN_PRICE} USDC"
            )));
        }

        let category = ListingCategory::parse(&self.category)
            .map_err(|e| MarketError::Validation(e.to_string()))?;

        let image_url = self.image_url.trim();
        if image_url.is_empty() {
            return Err(MarketError::Validation("image url is required".into()));
        }

        let delivery_payload = self.delivery_payload.trim();
        if delivery_payload.is_empty() {
            return Err(MarketError::Validation(
                "delivery payload is required".into(),
            ));
        }

        Ok(ValidListing {
            wallet,
            title,
            description,
            image_url: image_url.to_string(),
            demo_video_url: optional_url("demo video url", &self.demo_video_url)?,
            whitepaper_url: optional_url("whitepaper url", &self.whitepaper_url)?,
            github_url: optional_url("github url", &self.github_url)?,
            price,
            category,
            delivery_payload: delivery_payload.to_string(),
        })
    }
}

/// Strip control characters and angle brackets, then trim.
pub fn sanitize_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '<' | '>'))
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn parse_wallet(raw: &str) -> Result<WalletAddress, MarketError> {
    WalletAddress::parse(raw.trim()).map_err(|_| MarketError::InvalidWallet(raw.to_string()))
}

/// A payment reference is an opaque token: non-empty, bounded, no whitespace.
pub fn validate_reference(raw: &str) -> Result<&str, MarketError> {
    if raw.is_empty() {
        return Err(MarketError::Validation("payment reference is required".into()));
    }
    if raw.chars().count() > PAYMENT_REFERENCE_MAX_CHARS {
        return Err(MarketError::Validation(format!(
            "payment reference exceeds {PAYMENT_REFERENCE_MAX_CHARS} characters"
        )));
    }
    if raw.chars().any(char::is_whitespace) {
        return Err(MarketError::Validation(
            "payment reference must not contain whitespace".into(),
        ));
    }
    Ok(raw)
}

/// Trimmed report reason; blank reasons become `None`.
pub fn validate_reason(raw: Option<&str>) -> Result<Option<String>, MarketError> {
    let Some(reason) = raw.map(sanitize_text).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    if reason.chars().count() > REPORT_REASON_MAX_CHARS {
        return Err(MarketError::Validation(format!(
            "reason exceeds {REPORT_REASON_MAX_CHARS} characters"
        )));
    }
    Ok(Some(reason))
}

fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), MarketError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(MarketError::Validation(format!(
            "{field} must be between {min} and {max} characters (got {len})"
        )));
    }
    Ok(())
}

fn optional_url(field: &str, raw: &Option<String>) -> Result<Option<String>, MarketError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(url) if url.starts_with("https://") || url.starts_with("http://") => {
            Ok(Some(url.to_string()))
        }
        Some(_) => Err(MarketError::Validation(format!(
            "{field} must be an http(s) url"
        ))),
    }
}
