//! LMDB implementation of TransactionStore.

use heed::RoTxn;
use souk_store::{
    ListingRecord, PurchaseCommit, PurchaseDraft, StoreError, TransactionRecord, TransactionStore,
};
use souk_types::TransactionId;

use crate::environment::{commit, decode, encode, heed_err, LmdbEnvironment};
use crate::LmdbError;

impl LmdbEnvironment {
    fn transaction_in(
        &self,
        txn: &RoTxn<'_>,
        id: &[u8],
    ) -> Result<Option<TransactionRecord>, StoreError> {
        match self.transactions_db.get(txn, id).map_err(heed_err)? {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }

    fn transaction_by_reference_in(
        &self,
        txn: &RoTxn<'_>,
        reference: &str,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        let Some(id) = self
            .payment_refs_db
            .get(txn, reference.as_bytes())
            .map_err(heed_err)?
        else {
            return Ok(None);
        };
        let id = id.to_vec();
        match self.transaction_in(txn, &id)? {
            Some(tx) => Ok(Some(tx)),
            None => Err(LmdbError::Corruption(format!(
                "payment reference {reference} points at a missing transaction"
            ))
            .into()),
        }
    }
}

impl TransactionStore for LmdbEnvironment {
    fn commit_purchase(&self, draft: &PurchaseDraft) -> Result<PurchaseCommit, StoreError> {
        let mut txn = self.write_txn()?;

        let listing: ListingRecord = match self
            .listings_db
            .get(&txn, &draft.listing_id.as_bytes()[..])
            .map_err(heed_err)?
        {
            Some(bytes) => decode(bytes)?,
            None => return Err(StoreError::NotFound(draft.listing_id.to_hex())),
        };
        if !listing.is_purchasable() {
            return Ok(PurchaseCommit::NotPurchasable(listing.status));
        }
        if let Some(existing) = self.transaction_by_reference_in(&txn, &draft.payment_reference)? {
            return Ok(PurchaseCommit::Duplicate(existing));
        }

        let record = draft.clone().into_record(listing.delivery_payload);
        let id = &record.id.as_bytes()[..];
        self.transactions_db
            .put(&mut txn, id, encode(&record)?.as_slice())
            .map_err(heed_err)?;
        self.payment_refs_db
            .put(&mut txn, record.payment_reference.as_bytes(), id)
            .map_err(heed_err)?;
        commit(txn)?;
        Ok(PurchaseCommit::Recorded(record))
    }

    fn get_transaction(&self, id: &TransactionId) -> Result<TransactionRecord, StoreError> {
        let txn = self.read_txn()?;
        self.transaction_in(&txn, &id.as_bytes()[..])?
            .ok_or_else(|| StoreError::NotFound(id.to_hex()))
    }

    fn find_by_reference(&self, reference: &str) -> Result<Option<TransactionRecord>, StoreError> {
        let txn = self.read_txn()?;
        self.transaction_by_reference_in(&txn, reference)
    }

    fn iter_transactions(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        let txn = self.read_txn()?;
        let mut out = Vec::new();
        for entry in self.transactions_db.iter(&txn).map_err(heed_err)? {
            let (_, bytes) = entry.map_err(heed_err)?;
            out.push(decode(bytes)?);
        }
        Ok(out)
    }

    fn transaction_count(&self) -> Result<u64, StoreError> {
        let txn = self.read_txn()?;
        self.transactions_db.len(&txn).map_err(heed_err)
    }
}
