//! Nullable store: thread-safe in-memory storage for testing.

use souk_store::{
    ListingRecord, ListingStore, LogRecord, LogStore, PurchaseCommit, PurchaseDraft, ReportRecord,
    ReportStore, StoreError, TransactionRecord, TransactionStore, UserRecord, UserStore,
};
use souk_types::{ListingId, Timestamp, TransactionId, WalletAddress};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// An in-memory implementation of every marketplace store.
/// Thread-safe for use with tokio's multi-threaded runtime.
///
/// Lock order, where more than one map is held: `listings` first, then
/// either `reports` or `transactions` followed by `references`.
pub struct NullStore {
    listings: Mutex<HashMap<ListingId, ListingRecord>>,
    transactions: Mutex<HashMap<TransactionId, TransactionRecord>>,
    references: Mutex<HashMap<String, TransactionId>>,
    users: Mutex<HashMap<WalletAddress, UserRecord>>,
    reports: Mutex<Vec<ReportRecord>>,
    logs: Mutex<Vec<LogRecord>>,
    unavailable: AtomicBool,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            listings: Mutex::new(HashMap::new()),
            transactions: Mutex::new(HashMap::new()),
            references: Mutex::new(HashMap::new()),
            users: Mutex::new(HashMap::new()),
            reports: Mutex::new(Vec::new()),
            logs: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// While unavailable, every operation fails with `StoreError::Backend`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every log entry, in append order.
    pub fn logs(&self) -> Vec<LogRecord> {
        self.logs.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Backend("null store is unavailable".into()))
        } else {
            Ok(())
        }
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingStore for NullStore {
    fn insert_listing(&self, listing: &ListingRecord) -> Result<(), StoreError> {
        self.check()?;
        let mut listings = self.listings.lock().unwrap();
        if listings.contains_key(&listing.id) {
            return Err(StoreError::Duplicate(listing.id.to_hex()));
        }
        listings.insert(listing.id, listing.clone());
        Ok(())
    }

    fn get_listing(&self, id: &ListingId) -> Result<ListingRecord, StoreError> {
        self.check()?;
        self.listings
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_hex()))
    }

    fn compare_and_swap(
        &self,
        expected_version: u64,
        listing: &ListingRecord,
    ) -> Result<(), StoreError> {
        self.check()?;
        let mut listings = self.listings.lock().unwrap();
        let stored = listings
            .get_mut(&listing.id)
            .ok_or_else(|| StoreError::NotFound(listing.id.to_hex()))?;
        if stored.version != expected_version {
            return Err(StoreError::Conflict(format!(
                "listing {} is at version {}, expected {}",
                listing.id, stored.version, expected_version
            )));
        }
        *stored = listing.clone();
        Ok(())
    }

    fn delete_listing(&self, id: &ListingId) -> Result<(), StoreError> {
        self.check()?;
        let mut listings = self.listings.lock().unwrap();
        let mut reports = self.reports.lock().unwrap();
        if listings.remove(id).is_none() {
            return Err(StoreError::NotFound(id.to_hex()));
        }
        reports.retain(|r| &r.listing_id != id);
        Ok(())
    }

    fn iter_listings(&self) -> Result<Vec<ListingRecord>, StoreError> {
        self.check()?;
        Ok(self.listings.lock().unwrap().values().cloned().collect())
    }
}

impl TransactionStore for NullStore {
    fn commit_purchase(&self, draft: &PurchaseDraft) -> Result<PurchaseCommit, StoreError> {
        self.check()?;
        let listings = self.listings.lock().unwrap();
        let mut transactions = self.transactions.lock().unwrap();
        let mut references = self.references.lock().unwrap();

        let listing = listings
            .get(&draft.listing_id)
            .ok_or_else(|| StoreError::NotFound(draft.listing_id.to_hex()))?;
        if !listing.is_purchasable() {
            return Ok(PurchaseCommit::NotPurchasable(listing.status));
        }
        if let Some(existing) = references
            .get(&draft.payment_reference)
            .and_then(|id| transactions.get(id))
        {
            return Ok(PurchaseCommit::Duplicate(existing.clone()));
        }

        let record = draft.clone().into_record(listing.delivery_payload.clone());
        references.insert(record.payment_reference.clone(), record.id);
        transactions.insert(record.id, record.clone());
        Ok(PurchaseCommit::Recorded(record))
    }

    fn get_transaction(&self, id: &TransactionId) -> Result<TransactionRecord, StoreError> {
        self.check()?;
        self.transactions
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_hex()))
    }

    fn find_by_reference(&self, reference: &str) -> Result<Option<TransactionRecord>, StoreError> {
        self.check()?;
        let transactions = self.transactions.lock().unwrap();
        let references = self.references.lock().unwrap();
        Ok(references
            .get(reference)
            .and_then(|id| transactions.get(id))
            .cloned())
    }

    fn iter_transactions(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        self.check()?;
        Ok(self.transactions.lock().unwrap().values().cloned().collect())
    }
}

impl UserStore for NullStore {
    fn get_user(&self, wallet: &WalletAddress) -> Result<Option<UserRecord>, StoreError> {
        self.check()?;
        Ok(self.users.lock().unwrap().get(wallet).cloned())
    }

    fn update_user(
        &self,
        wallet: &WalletAddress,
        apply: &mut dyn FnMut(Option<UserRecord>) -> UserRecord,
    ) -> Result<UserRecord, StoreError> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        let updated = apply(users.get(wallet).cloned());
        users.insert(wallet.clone(), updated.clone());
        Ok(updated)
    }

    fn user_count(&self) -> Result<u64, StoreError> {
        self.check()?;
        Ok(self.users.lock().unwrap().len() as u64)
    }
}

impl ReportStore for NullStore {
    fn insert_report(&self, report: &ReportRecord) -> Result<u32, StoreError> {
        self.check()?;
        let mut listings = self.listings.lock().unwrap();
        let mut reports = self.reports.lock().unwrap();
        let listing = listings
            .get_mut(&report.listing_id)
            .ok_or_else(|| StoreError::NotFound(report.listing_id.to_hex()))?;
        if reports.iter().any(|r| {
            r.listing_id == report.listing_id && r.reporter_wallet == report.reporter_wallet
        }) {
            return Err(StoreError::Duplicate(format!(
                "{} already reported listing {}",
                report.reporter_wallet.short(),
                report.listing_id
            )));
        }
        reports.push(report.clone());
        listing.reports_count = listing.reports_count.saturating_add(1);
        listing.updated_at = report.created_at;
        listing.version += 1;
        Ok(listing.reports_count)
    }

    fn reports_for_listing(&self, listing_id: &ListingId) -> Result<Vec<ReportRecord>, StoreError> {
        self.check()?;
        Ok(self
            .reports
            .lock()
            .unwrap()
            .iter()
            .filter(|r| &r.listing_id == listing_id)
            .cloned()
            .collect())
    }
}

impl LogStore for NullStore {
    fn append_log(&self, entry: &LogRecord) -> Result<(), StoreError> {
        self.check()?;
        self.logs.lock().unwrap().push(entry.clone());
        Ok(())
    }

    fn logs_since(&self, since: Timestamp) -> Result<Vec<LogRecord>, StoreError> {
        self.check()?;
        let mut out: Vec<LogRecord> = self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.created_at >= since)
            .cloned()
            .collect();
        out.sort_by_key(|l| l.created_at);
        Ok(out)
    }

    fn purge_logs_before(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        self.check()?;
        let mut logs = self.logs.lock().unwrap();
        let before = logs.len();
        logs.retain(|l| l.created_at >= cutoff);
        Ok((before - logs.len()) as u64)
    }
}
