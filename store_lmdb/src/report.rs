//! LMDB implementation of ReportStore.

use souk_store::{ListingRecord, ReportRecord, ReportStore, StoreError};
use souk_types::{ListingId, WalletAddress};

use crate::environment::{commit, decode, encode, heed_err, LmdbEnvironment};

/// `listing id ++ reporter wallet`; the uniqueness key for reports.
fn pair_key(listing_id: &ListingId, reporter: &WalletAddress) -> Vec<u8> {
    let mut key = Vec::with_capacity(ListingId::LEN + reporter.as_str().len());
    key.extend_from_slice(listing_id.as_bytes());
    key.extend_from_slice(reporter.as_str().as_bytes());
    key
}

impl ReportStore for LmdbEnvironment {
    fn insert_report(&self, report: &ReportRecord) -> Result<u32, StoreError> {
        let listing_key = &report.listing_id.as_bytes()[..];
        let pair = pair_key(&report.listing_id, &report.reporter_wallet);
        let mut txn = self.write_txn()?;
        let mut listing: ListingRecord =
            match self.listings_db.get(&txn, listing_key).map_err(heed_err)? {
                Some(bytes) => decode(bytes)?,
                None => return Err(StoreError::NotFound(report.listing_id.to_hex())),
            };
        if self
            .report_pairs_db
            .get(&txn, pair.as_slice())
            .map_err(heed_err)?
            .is_some()
        {
            return Err(StoreError::Duplicate(format!(
                "{} already reported listing {}",
                report.reporter_wallet.short(),
                report.listing_id
            )));
        }
        let id = &report.id.as_bytes()[..];
        self.reports_db
            .put(&mut txn, id, encode(report)?.as_slice())
            .map_err(heed_err)?;
        self.report_pairs_db
            .put(&mut txn, pair.as_slice(), id)
            .map_err(heed_err)?;

        listing.reports_count = listing.reports_count.saturating_add(1);
        listing.updated_at = report.created_at;
        listing.version += 1;
        self.listings_db
            .put(&mut txn, listing_key, encode(&listing)?.as_slice())
            .map_err(heed_err)?;
        commit(txn)?;
        Ok(listing.reports_count)
    }

    fn reports_for_listing(&self, listing_id: &ListingId) -> Result<Vec<ReportRecord>, StoreError> {
        let txn = self.read_txn()?;
        let mut out = Vec::new();
        for entry in self
            .report_pairs_db
            .prefix_iter(&txn, &listing_id.as_bytes()[..])
            .map_err(heed_err)?
        {
            let (_, id) = entry.map_err(heed_err)?;
            if let Some(bytes) = self.reports_db.get(&txn, id).map_err(heed_err)? {
                out.push(decode(bytes)?);
            }
        }
        Ok(out)
    }
}
