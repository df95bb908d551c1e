//! Listing lifecycle: submission, moderation transitions, withdrawal, deletion
//! and the read side.
//!
//! ```text
//!   submit ──► PendingReview ──approve──► Live ──withdraw/reject──► Pulled
//!                   │                      ▲                          │
//!                   └───────reject─────────┼──────────► Pulled        │
//!                                          └─────────approve──────────┘
//! ```
//!
//! Every write is a compare-and-swap on the listing's version. A writer that
//! loses the race reloads the listing and re-applies its transition.

use std::sync::Arc;

use souk_crypto::PayloadCipher;
use souk_store::{ListingRecord, ListingStore, MarketStore, StoreError};
use souk_types::{
    Clock, ListingCategory, ListingId, ListingStatus, LogKind, RiskLevel,
};

use crate::audit::AuditLog;
use crate::metrics::MarketMetrics;
use crate::validation::{parse_wallet, SubmitListing};
use crate::view::ListingView;
use crate::MarketError;

/// Compare-and-swap attempts before a write gives up with `Conflict`.
const MAX_WRITE_ATTEMPTS: usize = 4;

#[derive(Clone)]
pub struct ListingLifecycle {
    store: Arc<dyn MarketStore>,
    clock: Arc<dyn Clock>,
    cipher: Arc<PayloadCipher>,
    audit: AuditLog,
    metrics: Arc<MarketMetrics>,
}

impl ListingLifecycle {
    pub fn new(
        store: Arc<dyn MarketStore>,
        clock: Arc<dyn Clock>,
        cipher: Arc<PayloadCipher>,
        audit: AuditLog,
        metrics: Arc<MarketMetrics>,
    ) -> Self {
        Self {
            store,
            clock,
            cipher,
            audit,
            metrics,
        }
    }

    /// Validate and store a new listing in `PendingReview`.
    pub fn submit(&self, input: &SubmitListing) -> Result<ListingView, MarketError> {
        let valid = input.validate()?;
        let id = ListingId::generate();
        let now = self.clock.now();
        let sealed = self.cipher.seal(id.as_bytes(), &valid.delivery_payload)?;

        let record = ListingRecord {
            id,
            wallet: valid.wallet,
            title: valid.title,
            description: valid.description,
            image_url: valid.image_url,
            demo_video_url: valid.demo_video_url,
            whitepaper_url: valid.whitepaper_url,
            github_url: valid.github_url,
            delivery_payload: sealed,
            price: valid.price,
            category: valid.category,
            risk_level: RiskLevel::Standard,
            status: ListingStatus::PendingReview,
            reports_count: 0,
            failed_purchase_count: 0,
            last_failure_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        self.store.insert_listing(&record)?;

        self.metrics.listings_submitted.inc();
        self.audit.record(
            LogKind::ListingSubmitted,
            format!("listing {} submitted: {}", record.id, record.title),
            Some(&record.wallet),
            None,
        );
        tracing::info!(
            operation = "submit",
            listing_id = %record.id,
            wallet = record.wallet.short(),
            "listing submitted for review"
        );
        Ok(ListingView::from(&record))
    }

    /// Put a listing on market. Idempotent on Live; relists a Pulled listing.
    pub fn approve(&self, id: &str) -> Result<ListingView, MarketError> {
        let record = self.update(id, "approve", |l| {
            Ok(set_status(l, ListingStatus::Live))
        })?;
        Ok(ListingView::from(&record))
    }

    /// Take a listing off market from any state.
    pub fn reject(&self, id: &str) -> Result<ListingView, MarketError> {
        let record = self.update(id, "reject", |l| {
            Ok(set_status(l, ListingStatus::Pulled))
        })?;
        Ok(ListingView::from(&record))
    }

    /// Seller-initiated pull of a Live listing.
    pub fn withdraw(&self, id: &str, caller: &str) -> Result<ListingView, MarketError> {
        let caller = parse_wallet(caller)?;
        let record = self.update(id, "withdraw", |l| {
            if l.wallet != caller {
                return Err(MarketError::Forbidden(
                    "only the seller can withdraw a listing".into(),
                ));
            }
            if l.status != ListingStatus::Live {
                return Err(MarketError::InvalidTransition(format!(
                    "cannot withdraw a listing that is {}",
                    l.status
                )));
            }
            Ok(set_status(l, ListingStatus::Pulled))
        })?;
        Ok(ListingView::from(&record))
    }

    pub fn set_risk(&self, id: &str, level: RiskLevel) -> Result<ListingView, MarketError> {
        let record = self.update(id, "set_risk", |l| {
            if l.risk_level == level {
                return Ok(false);
            }
            l.risk_level = level;
            Ok(true)
        })?;
        Ok(ListingView::from(&record))
    }

    /// Remove a listing permanently, along with the reports filed against it.
    /// Owner only, any state.
    pub fn delete(&self, id: &str, caller: &str) -> Result<(), MarketError> {
        let caller = parse_wallet(caller)?;
        let listing = self.load(id)?;
        if listing.wallet != caller {
            return Err(MarketError::Forbidden(
                "only the seller can delete a listing".into(),
            ));
        }
        match self.store.delete_listing(&listing.id) {
            Ok(()) => {}
            Err(StoreError::NotFound(_)) => return Err(not_found(id)),
            Err(e) => return Err(e.into()),
        }
        tracing::info!(
            operation = "delete",
            listing_id = %listing.id,
            wallet = caller.short(),
            "listing deleted"
        );
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<ListingView, MarketError> {
        Ok(ListingView::from(&self.load(id)?))
    }

    /// Live listings, newest first, optionally restricted to one category.
    pub fn list_live(
        &self,
        category: Option<ListingCategory>,
    ) -> Result<Vec<ListingView>, MarketError> {
        let live = self
            .store
            .live_listings()?
            .into_iter()
            .filter(|l| category.map_or(true, |c| l.category == c))
            .collect();
        Ok(newest_first(live))
    }

    /// Every listing of one seller, any state, newest first.
    pub fn list_by_wallet(&self, wallet: &str) -> Result<Vec<ListingView>, MarketError> {
        let wallet = parse_wallet(wallet)?;
        Ok(newest_first(self.store.listings_by_wallet(&wallet)?))
    }

    /// Every listing, any state, newest first.
    pub fn list_all(&self) -> Result<Vec<ListingView>, MarketError> {
        Ok(newest_first(self.store.iter_listings()?))
    }

    /// Count a payment that failed verification against this listing.
    pub(crate) fn record_failed_purchase(&self, id: &ListingId) -> Result<(), MarketError> {
        let now = self.clock.now();
        self.update(&id.to_hex(), "record_failed_purchase", |l| {
            l.failed_purchase_count = l.failed_purchase_count.saturating_add(1);
            l.last_failure_at = Some(now);
            Ok(true)
        })?;
        Ok(())
    }

    /// Load the full record, including the sealed payload.
    pub(crate) fn load(&self, id: &str) -> Result<ListingRecord, MarketError> {
        let parsed: ListingId = id.parse().map_err(|_| not_found(id))?;
        match self.store.get_listing(&parsed) {
            Ok(record) => Ok(record),
            Err(StoreError::NotFound(_)) => Err(not_found(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Read-modify-write one listing under compare-and-swap.
    ///
    /// `apply` mutates a copy of the current record and returns whether it
    /// changed anything; an unchanged record is returned without a write.
    fn update<F>(
        &self,
        id: &str,
        operation: &'static str,
        mut apply: F,
    ) -> Result<ListingRecord, MarketError>
    where
        F: FnMut(&mut ListingRecord) -> Result<bool, MarketError>,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self.load(id)?;
            let mut next = current.clone();
            if !apply(&mut next)? {
                return Ok(current);
            }
            next.version = current.version + 1;
            next.updated_at = self.clock.now();

            match self.store.compare_and_swap(current.version, &next) {
                Ok(()) => {
                    tracing::info!(
                        operation,
                        listing_id = %next.id,
                        status = %next.status,
                        version = next.version,
                        "listing updated"
                    );
                    return Ok(next);
                }
                Err(StoreError::Conflict(_)) => {
                    tracing::debug!(operation, listing_id = id, attempt, "write conflict, retrying");
                }
                Err(StoreError::NotFound(_)) => return Err(not_found(id)),
                Err(e) => return Err(e.into()),
            }
        }
        tracing::warn!(operation, listing_id = id, "gave up after repeated write conflicts");
        Err(MarketError::Conflict(id.to_string()))
    }
}

fn set_status(listing: &mut ListingRecord, status: ListingStatus) -> bool {
    if listing.status == status {
        return false;
    }
    listing.status = status;
    true
}

fn not_found(id: &str) -> MarketError {
    MarketError::NotFound(format!("listing {id}"))
}

fn newest_first(mut listings: Vec<ListingRecord>) -> Vec<ListingView> {
    listings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    listings.iter().map(ListingView::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use souk_nullables::{NullClock, NullStore};

    const SELLER: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
    const OTHER: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    fn setup() -> (Arc<NullStore>, Arc<NullClock>, ListingLifecycle) {
        let store = Arc::new(NullStore::new());
        let clock = Arc::new(NullClock::new(1_000));
        let audit = AuditLog::new(store.clone(), clock.clone(), 7 * 86_400);
        let cipher = Arc::new(PayloadCipher::from_secret(b"test delivery key").unwrap());
        let lifecycle = ListingLifecycle::new(
            store.clone(),
            clock.clone(),
            cipher,
            audit,
            Arc::new(MarketMetrics::new()),
        );
        (store, clock, lifecycle)
    }

    fn submission(title: &str) -> SubmitListing {
        SubmitListing {
            wallet: SELLER.into(),
            title: title.into(),
            description: "A well documented script that rebalances a portfolio every hour."
                .into(),
            image_url: "https://img.example/s.png".into(),
            price: 5.0,
            category: "Script".into(),
            delivery_payload: "https://files.example/secret.zip".into(),
            ..SubmitListing::default()
        }
    }

    #[test]
    fn submit_starts_in_review_and_seals_payload() {
        let (store, _clock, lifecycle) = setup();
        let view = lifecycle.submit(&submission("Rebalancer")).unwrap();
        assert_eq!(view.status, ListingStatus::PendingReview);
        assert_eq!((view.state, view.approved), ("in_review", false));
        assert_eq!(view.risk_level, "standard");

        let stored = lifecycle.load(&view.id).unwrap();
        assert!(!stored
            .delivery_payload
            .windows(6)
            .any(|w| w == b"secret"));
        assert_eq!(store.logs()[0].kind, LogKind::ListingSubmitted);
    }

    #[test]
    fn approve_is_idempotent() {
        let (_store, _clock, lifecycle) = setup();
        let id = lifecycle.submit(&submission("Rebalancer")).unwrap().id;
        let first = lifecycle.approve(&id).unwrap();
        let second = lifecycle.approve(&id).unwrap();
        assert_eq!(first.status, ListingStatus::Live);
        assert_eq!(first, second);
        assert_eq!(lifecycle.load(&id).unwrap().version, 1);
    }

    #[test]
    fn reject_from_any_state_and_relist() {
        let (_store, _clock, lifecycle) = setup();
        let id = lifecycle.submit(&submission("Rebalancer")).unwrap().id;
        assert_eq!(lifecycle.reject(&id).unwrap().status, ListingStatus::Pulled);
        assert_eq!(lifecycle.approve(&id).unwrap().status, ListingStatus::Live);
        assert_eq!(lifecycle.reject(&id).unwrap().state, "pulled");
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let (_store, _clock, lifecycle) = setup();
        for id in ["000000000000000000000000", "not-an-id"] {
            assert!(matches!(lifecycle.approve(id), Err(MarketError::NotFound(_))));
            assert!(matches!(lifecycle.get(id), Err(MarketError::NotFound(_))));
        }
    }

    #[test]
    fn withdraw_rules() {
        let (_store, _clock, lifecycle) = setup();
        let id = lifecycle.submit(&submission("Rebalancer")).unwrap().id;

        assert!(matches!(
            lifecycle.withdraw(&id, SELLER),
            Err(MarketError::InvalidTransition(_))
        ));
        lifecycle.approve(&id).unwrap();
        assert!(matches!(
            lifecycle.withdraw(&id, OTHER),
            Err(MarketError::Forbidden(_))
        ));
        assert!(matches!(
            lifecycle.withdraw(&id, "bogus"),
            Err(MarketError::InvalidWallet(_))
        ));
        assert_eq!(lifecycle.withdraw(&id, SELLER).unwrap().status, ListingStatus::Pulled);
    }

    #[test]
    fn delete_owner_only() {
        let (_store, _clock, lifecycle) = setup();
        let id = lifecycle.submit(&submission("Rebalancer")).unwrap().id;
        assert!(matches!(
            lifecycle.delete(&id, OTHER),
            Err(MarketError::Forbidden(_))
        ));
        lifecycle.delete(&id, SELLER).unwrap();
        assert!(matches!(lifecycle.get(&id), Err(MarketError::NotFound(_))));
        assert!(matches!(
            lifecycle.delete(&id, SELLER),
            Err(MarketError::NotFound(_))
        ));
    }

    #[test]
    fn set_risk_changes_only_risk() {
        let (_store, _clock, lifecycle) = setup();
        let id = lifecycle.submit(&submission("Rebalancer")).unwrap().id;
        let view = lifecycle.set_risk(&id, RiskLevel::HighRisk).unwrap();
        assert_eq!(view.risk_level, "high-risk");
        assert_eq!(view.status, ListingStatus::PendingReview);
    }

    #[test]
    fn reads_are_newest_first_and_filtered() {
        let (_store, clock, lifecycle) = setup();
        let older = lifecycle.submit(&submission("Older script")).unwrap().id;
        clock.advance(10);
        let newer = lifecycle.submit(&submission("Newer script")).unwrap().id;
        clock.advance(10);
        let pending = lifecycle.submit(&submission("Pending one")).unwrap().id;
        lifecycle.approve(&older).unwrap();
        lifecycle.approve(&newer).unwrap();

        let live: Vec<_> = lifecycle
            .list_live(None)
            .unwrap()
            .into_iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(live, vec![newer.clone(), older.clone()]);
        assert!(lifecycle
            .list_live(Some(ListingCategory::TradingBot))
            .unwrap()
            .is_empty());

        let mine = lifecycle.list_by_wallet(SELLER).unwrap();
        assert_eq!(mine.len(), 3);
        assert_eq!(mine[0].id, pending);
        assert_eq!(lifecycle.list_all().unwrap().len(), 3);
        assert!(lifecycle.list_by_wallet(OTHER).unwrap().is_empty());
    }

    #[test]
    fn store_outage_surfaces_as_unavailable() {
        let (store, _clock, lifecycle) = setup();
        store.set_unavailable(true);
        assert!(matches!(
            lifecycle.list_all(),
            Err(MarketError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn concurrent_writers_all_land() {
        let (_store, _clock, lifecycle) = setup();
        let id = lifecycle.submit(&submission("Rebalancer")).unwrap().id;
        let listing_id: ListingId = id.parse().unwrap();

        std::thread::scope(|s| {
            for _ in 0..3 {
                s.spawn(|| lifecycle.record_failed_purchase(&listing_id).unwrap());
            }
        });
        let record = lifecycle.load(&id).unwrap();
        assert_eq!(record.failed_purchase_count, 3);
        assert_eq!(record.version, 3);
    }
}
