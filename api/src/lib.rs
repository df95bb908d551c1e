//! HTTP API for the Souk marketplace.
//!
//! Provides endpoints for:
//! - Listing submission, browsing, withdrawal and deletion
//! - Purchase settlement and delivery disclosure
//! - Wallet connect and terms-of-service acceptance
//! - Abuse reports
//! - Admin login and moderation
//! - Health and Prometheus metrics

pub mod error;
pub mod handlers;
pub mod server;
pub mod session;

pub use error::{ApiError, ApiResult};
pub use server::{router, ApiServer};
