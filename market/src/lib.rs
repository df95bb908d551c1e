//! Souk marketplace core.
//!
//! Sellers submit listings that an admin approves before they go on market.
//! Buyers pay on-chain, then claim the purchase with the payment reference;
//! each reference settles at most one purchase and discloses the listing's
//! delivery payload to the buyer. Wallets must hold enough gating tokens and
//! accept the terms of service before they can browse, sell or buy.
//!
//! Storage, the payment network and time all arrive as trait objects through
//! [`Collaborators`], so the same [`Marketplace`] runs against LMDB and real
//! RPC endpoints in the daemon and against nullables in tests.

pub mod access;
pub mod admin;
pub mod audit;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod reports;
pub mod service;
pub mod settlement;
pub mod validation;
pub mod view;

pub use access::{AccessGate, AccessStatus};
pub use admin::{AdminDesk, AdminSession, SESSION_TTL_SECS};
pub use audit::AuditLog;
pub use config::{DuplicatePolicy, MarketConfig};
pub use error::MarketError;
pub use lifecycle::ListingLifecycle;
pub use metrics::MarketMetrics;
pub use reports::ReportDesk;
pub use service::{Collaborators, Marketplace};
pub use settlement::{PurchaseRequest, Receipt, SettlementEngine};
pub use validation::SubmitListing;
pub use view::ListingView;
