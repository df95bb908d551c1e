//! LMDB implementation of ListingStore.

use souk_store::{ListingRecord, ListingStore, StoreError};
use souk_types::ListingId;

use crate::environment::{commit, decode, encode, heed_err, LmdbEnvironment};

impl ListingStore for LmdbEnvironment {
    fn insert_listing(&self, listing: &ListingRecord) -> Result<(), StoreError> {
        let key = &listing.id.as_bytes()[..];
        let mut txn = self.write_txn()?;
        if self.listings_db.get(&txn, key).map_err(heed_err)?.is_some() {
            return Err(StoreError::Duplicate(listing.id.to_hex()));
        }
        self.listings_db
            .put(&mut txn, key, encode(listing)?.as_slice())
            .map_err(heed_err)?;
        commit(txn)
    }

    fn get_listing(&self, id: &ListingId) -> Result<ListingRecord, StoreError> {
        let txn = self.read_txn()?;
        let bytes = self
            .listings_db
            .get(&txn, &id.as_bytes()[..])
            .map_err(heed_err)?
            .ok_or_else(|| StoreError::NotFound(id.to_hex()))?;
        Ok(decode(bytes)?)
    }

    fn compare_and_swap(
        &self,
        expected_version: u64,
        listing: &ListingRecord,
    ) -> Result<(), StoreError> {
        let key = &listing.id.as_bytes()[..];
        let mut txn = self.write_txn()?;
        let stored: ListingRecord = match self.listings_db.get(&txn, key).map_err(heed_err)? {
            Some(bytes) => decode(bytes)?,
            None => return Err(StoreError::NotFound(listing.id.to_hex())),
        };
        if stored.version != expected_version {
            return Err(StoreError::Conflict(format!(
                "listing {} is at version {}, expected {}",
                listing.id, stored.version, expected_version
            )));
        }
        self.listings_db
            .put(&mut txn, key, encode(listing)?.as_slice())
            .map_err(heed_err)?;
        commit(txn)
    }

    fn delete_listing(&self, id: &ListingId) -> Result<(), StoreError> {
        let mut txn = self.write_txn()?;
        let removed = self
            .listings_db
            .delete(&mut txn, &id.as_bytes()[..])
            .map_err(heed_err)?;
        if !removed {
            return Err(StoreError::NotFound(id.to_hex()));
        }

        let mut filed = Vec::new();
        for entry in self
            .report_pairs_db
            .prefix_iter(&txn, &id.as_bytes()[..])
            .map_err(heed_err)?
        {
            let (pair, report_id) = entry.map_err(heed_err)?;
            filed.push((pair.to_vec(), report_id.to_vec()));
        }
        for (pair, report_id) in &filed {
            self.report_pairs_db
                .delete(&mut txn, pair.as_slice())
                .map_err(heed_err)?;
            self.reports_db
                .delete(&mut txn, report_id.as_slice())
                .map_err(heed_err)?;
        }
        commit(txn)
    }

    fn iter_listings(&self) -> Result<Vec<ListingRecord>, StoreError> {
        let txn = self.read_txn()?;
        let mut out = Vec::new();
        for entry in self.listings_db.iter(&txn).map_err(heed_err)? {
            let (_, bytes) = entry.map_err(heed_err)?;
            out.push(decode(bytes)?);
        }
        Ok(out)
    }

    fn listing_count(&self) -> Result<u64, StoreError> {
        let txn = self.read_txn()?;
        self.listings_db.len(&txn).map_err(heed_err)
    }
}
