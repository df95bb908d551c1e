//! LMDB implementation of LogStore.
//!
//! Keys are `created_at (big-endian) ++ log id`, so iteration order is
//! chronological and expiry is a scan from the front.

use souk_store::{LogRecord, LogStore, StoreError};
use souk_types::{LogId, Timestamp};

use crate::environment::{commit, decode, encode, heed_err, LmdbEnvironment};

fn log_key(created_at: Timestamp, id: &LogId) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + LogId::LEN);
    key.extend_from_slice(&created_at.as_secs().to_be_bytes());
    key.extend_from_slice(id.as_bytes());
    key
}

fn key_time(key: &[u8]) -> Option<u64> {
    let raw: [u8; 8] = key.get(..8)?.try_into().ok()?;
    Some(u64::from_be_bytes(raw))
}

impl LogStore for LmdbEnvironment {
    fn append_log(&self, entry: &LogRecord) -> Result<(), StoreError> {
        let mut txn = self.write_txn()?;
        let key = log_key(entry.created_at, &entry.id);
        self.logs_db
            .put(&mut txn, key.as_slice(), encode(entry)?.as_slice())
            .map_err(heed_err)?;
        commit(txn)
    }

    fn logs_since(&self, since: Timestamp) -> Result<Vec<LogRecord>, StoreError> {
        let txn = self.read_txn()?;
        let mut out = Vec::new();
        for entry in self.logs_db.iter(&txn).map_err(heed_err)? {
            let (key, bytes) = entry.map_err(heed_err)?;
            if key_time(key).is_some_and(|t| t >= since.as_secs()) {
                out.push(decode(bytes)?);
            }
        }
        Ok(out)
    }

    fn purge_logs_before(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        let mut txn = self.write_txn()?;
        let mut expired = Vec::new();
        for entry in self.logs_db.iter(&txn).map_err(heed_err)? {
            let (key, _) = entry.map_err(heed_err)?;
            match key_time(key) {
                Some(t) if t < cutoff.as_secs() => expired.push(key.to_vec()),
                _ => break,
            }
        }
        for key in &expired {
            self.logs_db.delete(&mut txn, key.as_slice()).map_err(heed_err)?;
        }
        commit(txn)?;
        if !expired.is_empty() {
            tracing::debug!(removed = expired.len(), cutoff = cutoff.as_secs(), "purged logs");
        }
        Ok(expired.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::temp_env;
    use souk_types::LogKind;

    fn entry(at: u64) -> LogRecord {
        LogRecord {
            id: LogId::generate(),
            kind: LogKind::Purchase,
            message: format!("purchase at {at}"),
            wallet: None,
            ip: None,
            created_at: Timestamp::new(at),
        }
    }

    #[test]
    fn logs_are_chronological() {
        let (_dir, env) = temp_env();
        for at in [300, 100, 200] {
            env.append_log(&entry(at)).unwrap();
        }
        let times: Vec<u64> = env
            .logs_since(Timestamp::new(150))
            .unwrap()
            .iter()
            .map(|l| l.created_at.as_secs())
            .collect();
        assert_eq!(times, vec![200, 300]);
    }

    #[test]
    fn purge_removes_only_older_entries() {
        let (_dir, env) = temp_env();
        for at in [100, 200, 300, 400] {
            env.append_log(&entry(at)).unwrap();
        }
        assert_eq!(env.purge_logs_before(Timestamp::new(300)).unwrap(), 2);
        assert_eq!(env.logs_since(Timestamp::EPOCH).unwrap().len(), 2);
        assert_eq!(env.purge_logs_before(Timestamp::new(300)).unwrap(), 0);
    }
}
