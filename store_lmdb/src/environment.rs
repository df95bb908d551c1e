//! LMDB environment setup.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use souk_store::StoreError;

use crate::LmdbError;

/// Default LMDB map size (1 GiB).
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

/// The schema version that the current code reads and writes.
pub const SCHEMA_VERSION: u32 = 1;

const MAX_DBS: u32 = 16;
const SCHEMA_KEY: &[u8] = b"schema_version";

/// Wraps the LMDB environment and all database handles.
///
/// Layout:
/// - `listings`: listing id -> `ListingRecord`
/// - `transactions`: transaction id -> `TransactionRecord`
/// - `payment_refs`: payment reference -> transaction id
/// - `users`: wallet address -> `UserRecord`
/// - `reports`: report id -> `ReportRecord`
/// - `report_pairs`: listing id ++ reporter wallet -> report id
/// - `logs`: created_at (big-endian) ++ log id -> `LogRecord`
/// - `meta`: schema version
pub struct LmdbEnvironment {
    env: Env,
    pub(crate) listings_db: Database<Bytes, Bytes>,
    pub(crate) transactions_db: Database<Bytes, Bytes>,
    pub(crate) payment_refs_db: Database<Bytes, Bytes>,
    pub(crate) users_db: Database<Bytes, Bytes>,
    pub(crate) reports_db: Database<Bytes, Bytes>,
    pub(crate) report_pairs_db: Database<Bytes, Bytes>,
    pub(crate) logs_db: Database<Bytes, Bytes>,
    meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given directory.
    ///
    /// Refuses to open a database written with a newer schema.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path).map_err(|e| LmdbError::Io(e.to_string()))?;

        // SAFETY: the environment directory is owned by this process; no other
        // handle to the same files is opened with different flags.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let listings_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("listings"))?;
        let transactions_db =
            env.create_database::<Bytes, Bytes>(&mut wtxn, Some("transactions"))?;
        let payment_refs_db =
            env.create_database::<Bytes, Bytes>(&mut wtxn, Some("payment_refs"))?;
        let users_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("users"))?;
        let reports_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("reports"))?;
        let report_pairs_db =
            env.create_database::<Bytes, Bytes>(&mut wtxn, Some("report_pairs"))?;
        let logs_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("logs"))?;
        let meta_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        let this = Self {
            env,
            listings_db,
            transactions_db,
            payment_refs_db,
            users_db,
            reports_db,
            report_pairs_db,
            logs_db,
            meta_db,
        };
        this.check_schema()?;
        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(this)
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Stored schema version; 0 for a database that has never been stamped.
    pub fn schema_version(&self) -> Result<u32, LmdbError> {
        let rtxn = self.env.read_txn()?;
        match self.meta_db.get(&rtxn, SCHEMA_KEY)? {
            None => Ok(0),
            Some(bytes) => {
                let raw: [u8; 4] = bytes
                    .try_into()
                    .map_err(|_| LmdbError::Corruption("schema version".into()))?;
                Ok(u32::from_be_bytes(raw))
            }
        }
    }

    fn check_schema(&self) -> Result<(), LmdbError> {
        let current = self.schema_version()?;
        if current > SCHEMA_VERSION {
            return Err(LmdbError::Heed(format!(
                "database schema version {current} is newer than supported version {SCHEMA_VERSION}"
            )));
        }
        if current < SCHEMA_VERSION {
            let mut wtxn = self.env.write_txn()?;
            self.meta_db
                .put(&mut wtxn, SCHEMA_KEY, SCHEMA_VERSION.to_be_bytes().as_slice())?;
            wtxn.commit()?;
            tracing::info!(from = current, to = SCHEMA_VERSION, "stamped schema version");
        }
        Ok(())
    }

    /// Flush the memory map to disk.
    pub fn sync(&self) -> Result<(), LmdbError> {
        self.env.force_sync()?;
        Ok(())
    }

    pub(crate) fn read_txn(&self) -> Result<RoTxn<'_>, StoreError> {
        Ok(self.env.read_txn().map_err(LmdbError::from)?)
    }

    pub(crate) fn write_txn(&self) -> Result<RwTxn<'_>, StoreError> {
        Ok(self.env.write_txn().map_err(LmdbError::from)?)
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LmdbError> {
    bincode::serialize(value).map_err(|e| LmdbError::Serialization(e.to_string()))
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LmdbError> {
    bincode::deserialize(bytes).map_err(|e| LmdbError::Serialization(e.to_string()))
}

pub(crate) fn commit(txn: RwTxn<'_>) -> Result<(), StoreError> {
    txn.commit().map_err(LmdbError::from)?;
    Ok(())
}

/// Map any heed failure into a store error.
pub(crate) fn heed_err(e: heed::Error) -> StoreError {
    LmdbError::from(e).into()
}
