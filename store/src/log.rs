//! Audit log storage trait.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use souk_types::{LogId, LogKind, Timestamp, WalletAddress};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: LogId,
    pub kind: LogKind,
    pub message: String,
    pub wallet: Option<WalletAddress>,
    pub ip: Option<String>,
    pub created_at: Timestamp,
}

/// Append-only log storage with time-based expiry.
pub trait LogStore: Send + Sync {
    fn append_log(&self, entry: &LogRecord) -> Result<(), StoreError>;

    /// Entries created at or after `since`, oldest first.
    fn logs_since(&self, since: Timestamp) -> Result<Vec<LogRecord>, StoreError>;

    /// Delete every entry created strictly before `cutoff`. Returns the number removed.
    fn purge_logs_before(&self, cutoff: Timestamp) -> Result<u64, StoreError>;
}
