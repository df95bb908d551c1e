use souk_chain::ChainError;
use souk_crypto::CryptoError;
use souk_store::StoreError;
use souk_types::ListingStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid wallet address: {0:?}")]
    InvalidWallet(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("listing is not available for purchase (status {0})")]
    NotPurchasable(ListingStatus),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("payment reference already used: {0}")]
    DuplicatePayment(String),

    #[error("listing already reported by this wallet")]
    DuplicateReport,

    #[error("payment could not be verified")]
    PaymentNotVerified,

    #[error("listing {0} is being modified concurrently")]
    Conflict(String),

    #[error("payment network error: {0}")]
    Oracle(#[from] ChainError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("storage unavailable: {0}")]
    StoreUnavailable(String),

    #[error("config error: {0}")]
    Config(String),
}

impl From<StoreError> for MarketError {
    fn from(e: StoreError) -> Self {
        tracing::error!(error = %e, "store operation failed");
        MarketError::StoreUnavailable(e.to_string())
    }
}
