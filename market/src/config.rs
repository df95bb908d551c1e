//! Marketplace configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::MarketError;

/// What to do when a payment reference that is already recorded comes in again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Return the original receipt when listing, buyer, seller and amount all
    /// match; reject otherwise.
    #[default]
    ReturnExisting,
    /// Always reject.
    Reject,
}

/// Configuration for a Souk marketplace node.
///
/// Can be loaded from a TOML file via [`MarketConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Data directory for LMDB storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Port for the HTTP API.
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Gating-token balance (UI units) a wallet needs to use the market.
    #[serde(default = "default_min_token_balance")]
    pub min_token_balance: f64,

    /// Mint address of the gating token.
    #[serde(default)]
    pub token_mint: String,

    /// JSON-RPC endpoint used for balance lookups.
    #[serde(default = "default_gating_rpc_url")]
    pub gating_rpc_url: String,

    /// JSON-RPC endpoint used for payment verification.
    #[serde(default = "default_payment_rpc_url")]
    pub payment_rpc_url: String,

    /// Skip the payment network: fixed balances, every payment verified.
    #[serde(default)]
    pub mock_chain: bool,

    /// Balance reported for every wallet in mock mode.
    #[serde(default = "default_mock_token_balance")]
    pub mock_token_balance: f64,

    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,

    /// Require token gating and accepted terms for browse, submit and purchase.
    #[serde(default = "default_true")]
    pub enforce_access: bool,

    /// Hide every admin route.
    #[serde(default)]
    pub disable_admin: bool,

    /// Code exchanged for an admin session.
    #[serde(default)]
    pub admin_code: Option<String>,

    /// HMAC key for admin session tokens.
    #[serde(default)]
    pub session_secret: Option<String>,

    /// Secret from which the delivery-payload encryption key is derived.
    #[serde(default)]
    pub delivery_key: Option<String>,

    /// Audit log retention in days.
    #[serde(default = "default_log_ttl_days")]
    pub log_ttl_days: u64,

    /// Interval between expired-log sweeps, in seconds.
    #[serde(default = "default_log_sweep_secs")]
    pub log_sweep_secs: u64,

    /// LMDB map size in bytes.
    #[serde(default = "default_lmdb_map_size")]
    pub lmdb_map_size: usize,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./souk_data")
}

fn default_api_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_min_token_balance() -> f64 {
    50_000.0
}

fn default_gating_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_payment_rpc_url() -> String {
    "https://api.devnet.solana.com".to_string()
}

fn default_mock_token_balance() -> f64 {
    1_000_000.0
}

fn default_true() -> bool {
    true
}

fn default_log_ttl_days() -> u64 {
    7
}

fn default_log_sweep_secs() -> u64 {
    3600
}

fn default_lmdb_map_size() -> usize {
    1 << 30
}

// ── Impl ───────────────────────────────────────────────────────────────

impl MarketConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, MarketError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| MarketError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, MarketError> {
        toml::from_str(s).map_err(|e| MarketError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("MarketConfig is always serializable to TOML")
    }

    /// Check that the settings needed at runtime are present and coherent.
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.delivery_key.as_deref().map_or(true, str::is_empty) {
            return Err(MarketError::Config("delivery_key is required".into()));
        }
        if !self.disable_admin {
            if self.admin_code.as_deref().map_or(true, str::is_empty) {
                return Err(MarketError::Config(
                    "admin_code is required unless disable_admin is set".into(),
                ));
            }
            if self.session_secret.as_deref().map_or(true, str::is_empty) {
                return Err(MarketError::Config(
                    "session_secret is required unless disable_admin is set".into(),
                ));
            }
        }
        if !self.mock_chain && self.token_mint.is_empty() {
            return Err(MarketError::Config(
                "token_mint is required unless mock_chain is set".into(),
            ));
        }
        if self.min_token_balance.is_nan() || self.min_token_balance < 0.0 {
            return Err(MarketError::Config(
                "min_token_balance must be a non-negative number".into(),
            ));
        }
        if self.log_ttl_days == 0 || self.log_sweep_secs == 0 {
            return Err(MarketError::Config(
                "log_ttl_days and log_sweep_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Audit log retention in seconds.
    pub fn log_ttl_secs(&self) -> u64 {
        self.log_ttl_days.saturating_mul(24 * 60 * 60)
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            api_port: default_api_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            min_token_balance: default_min_token_balance(),
            token_mint: String::new(),
            gating_rpc_url: default_gating_rpc_url(),
            payment_rpc_url: default_payment_rpc_url(),
            mock_chain: false,
            mock_token_balance: default_mock_token_balance(),
            duplicate_policy: DuplicatePolicy::default(),
            enforce_access: default_true(),
            disable_admin: false,
            admin_code: None,
            session_secret: None,
            delivery_key: None,
            log_ttl_days: default_log_ttl_days(),
            log_sweep_secs: default_log_sweep_secs(),
            lmdb_map_size: default_lmdb_map_size(),
        }
    }
}
