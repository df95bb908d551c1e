//! Abuse reports against listings. One report per wallet per listing.

use std::sync::Arc;

use souk_store::{MarketStore, ReportRecord, ReportStore, StoreError};
use souk_types::{Clock, LogKind, ReportId};

use crate::audit::AuditLog;
use crate::lifecycle::ListingLifecycle;
use crate::metrics::MarketMetrics;
use crate::validation::{parse_wallet, validate_reason};
use crate::MarketError;

#[derive(Clone)]
pub struct ReportDesk {
    store: Arc<dyn MarketStore>,
    clock: Arc<dyn Clock>,
    lifecycle: ListingLifecycle,
    audit: AuditLog,
    metrics: Arc<MarketMetrics>,
}

impl ReportDesk {
    pub fn new(
        store: Arc<dyn MarketStore>,
        clock: Arc<dyn Clock>,
        lifecycle: ListingLifecycle,
        audit: AuditLog,
        metrics: Arc<MarketMetrics>,
    ) -> Self {
        Self {
            store,
            clock,
            lifecycle,
            audit,
            metrics,
        }
    }

    /// File a report. Returns the listing's new report count.
    ///
    /// The report and the listing's counter are written together; on any
    /// error neither is stored and the same wallet may try again.
    pub fn report(
        &self,
        listing_id: &str,
        reporter: &str,
        reason: Option<&str>,
    ) -> Result<u32, MarketError> {
        let reporter = parse_wallet(reporter)?;
        let listing = self.lifecycle.load(listing_id)?;
        let reason = validate_reason(reason)?;

        let record = ReportRecord {
            id: ReportId::generate(),
            listing_id: listing.id,
            reporter_wallet: reporter.clone(),
            reason,
            created_at: self.clock.now(),
        };
        let count = match self.store.insert_report(&record) {
            Ok(count) => count,
            Err(StoreError::Duplicate(_)) => return Err(MarketError::DuplicateReport),
            Err(StoreError::NotFound(_)) => {
                return Err(MarketError::NotFound(format!("listing {listing_id}")))
            }
            Err(e) => return Err(e.into()),
        };
        self.metrics.reports_filed.inc();
        self.audit.record(
            LogKind::Report,
            format!(
                "listing {} reported: {}",
                listing.id,
                record.reason.as_deref().unwrap_or("no reason given")
            ),
            Some(&reporter),
            None,
        );
        tracing::info!(
            operation = "report",
            listing_id = %listing.id,
            wallet = reporter.short(),
            reports = count,
            "listing reported"
        );
        Ok(count)
    }

    pub fn reports_for(&self, listing_id: &str) -> Result<Vec<ReportRecord>, MarketError> {
        let listing = self.lifecycle.load(listing_id)?;
        Ok(self.store.reports_for_listing(&listing.id)?)
    }
}
