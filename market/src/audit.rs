//! Append-only audit trail with time-based expiry.
//!
//! Writing an audit entry never fails the operation being audited: a store
//! failure here is reported through `tracing` and swallowed.

use std::sync::Arc;

use souk_store::{LogRecord, LogStore, MarketStore};
use souk_types::{Clock, LogId, LogKind, Timestamp, WalletAddress};

use crate::MarketError;

#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn MarketStore>,
    clock: Arc<dyn Clock>,
    ttl_secs: u64,
}

impl AuditLog {
    pub fn new(store: Arc<dyn MarketStore>, clock: Arc<dyn Clock>, ttl_secs: u64) -> Self {
        Self {
            store,
            clock,
            ttl_secs,
        }
    }

    /// Append an entry. `ip` is kept only for kinds that record it.
    pub fn record(
        &self,
        kind: LogKind,
        message: impl Into<String>,
        wallet: Option<&WalletAddress>,
        ip: Option<&str>,
    ) {
        let entry = LogRecord {
            id: LogId::generate(),
            kind,
            message: message.into(),
            wallet: wallet.cloned(),
            ip: ip.filter(|_| kind.records_ip()).map(str::to_string),
            created_at: self.clock.now(),
        };
        if let Err(e) = self.store.append_log(&entry) {
            tracing::warn!(kind = kind.as_str(), error = %e, "failed to write audit entry");
        }
    }

    /// Entries newer than the retention window, oldest first.
    pub fn recent(&self) -> Result<Vec<LogRecord>, MarketError> {
        Ok(self.store.logs_since(self.cutoff())?)
    }

    /// Delete entries older than the retention window.
    pub fn purge_expired(&self) -> Result<u64, MarketError> {
        let cutoff = self.cutoff();
        let removed = self.store.purge_logs_before(cutoff)?;
        if removed > 0 {
            tracing::info!(removed, cutoff = cutoff.as_secs(), "purged expired audit entries");
        }
        Ok(removed)
    }

    fn cutoff(&self) -> Timestamp {
        self.clock.now().saturating_sub_secs(self.ttl_secs)
    }
}
