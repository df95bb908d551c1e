//! LMDB storage backend for the Souk marketplace.
//!
//! Implements all storage traits from `souk-store` using the `heed` LMDB bindings.
//! Each logical store maps to one or more LMDB databases within a single environment.
//! LMDB serialises write transactions, so every multi-step write (purchase
//! settlement, listing compare-and-swap, report uniqueness) runs inside one
//! write transaction and is atomic with respect to other writers.

pub mod environment;
pub mod error;
mod listing;
mod log;
mod report;
mod transaction;
mod user;

pub use environment::{LmdbEnvironment, DEFAULT_MAP_SIZE, SCHEMA_VERSION};
pub use error::LmdbError;

#[cfg(test)]
pub(crate) mod fixtures {
    use souk_store::ListingRecord;
    use souk_types::{
        ListingCategory, ListingId, ListingStatus, RiskLevel, Timestamp, UsdcAmount, WalletAddress,
    };

    pub const SELLER: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
    pub const BUYER: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    pub fn wallet(s: &str) -> WalletAddress {
        WalletAddress::parse(s).unwrap()
    }

    /// Helper: open a temporary LMDB environment.
    pub fn temp_env() -> (tempfile::TempDir, crate::LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let env = crate::LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024)
            .expect("failed to open env");
        (dir, env)
    }

    pub fn listing(status: ListingStatus) -> ListingRecord {
        ListingRecord {
            id: ListingId::generate(),
            wallet: wallet(SELLER),
            title: "Arbitrage bot".into(),
            description: "Cross-venue arbitrage".into(),
            image_url: "https://img.example/bot.png".into(),
            demo_video_url: None,
            whitepaper_url: None,
            github_url: None,
            delivery_payload: b"sealed".to_vec(),
            price: UsdcAmount::from_micros(25_000_000),
            category: ListingCategory::TradingBot,
            risk_level: RiskLevel::Standard,
            status,
            reports_count: 0,
            failed_purchase_count: 0,
            last_failure_at: None,
            created_at: Timestamp::new(1_000),
            updated_at: Timestamp::new(1_000),
            version: 0,
        }
    }
}
