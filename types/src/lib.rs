//! Fundamental types for the Souk marketplace.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! wallet addresses, USDC amounts, record ids, timestamps, and the listing enums.

pub mod address;
pub mod amount;
pub mod error;
pub mod id;
pub mod listing;
pub mod time;

pub use address::WalletAddress;
pub use amount::UsdcAmount;
pub use error::TypesError;
pub use id::{ListingId, LogId, ReportId, TransactionId};
pub use listing::{ListingCategory, ListingStatus, LogKind, RiskLevel, TransactionStatus};
pub use time::{Clock, SystemClock, Timestamp};
