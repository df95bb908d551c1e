//! LMDB implementation of UserStore.

use souk_store::{StoreError, UserRecord, UserStore};
use souk_types::WalletAddress;

use crate::environment::{commit, decode, encode, heed_err, LmdbEnvironment};

impl UserStore for LmdbEnvironment {
    fn get_user(&self, wallet: &WalletAddress) -> Result<Option<UserRecord>, StoreError> {
        let txn = self.read_txn()?;
        match self
            .users_db
            .get(&txn, wallet.as_str().as_bytes())
            .map_err(heed_err)?
        {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }

    fn update_user(
        &self,
        wallet: &WalletAddress,
        apply: &mut dyn FnMut(Option<UserRecord>) -> UserRecord,
    ) -> Result<UserRecord, StoreError> {
        let key = wallet.as_str().as_bytes();
        let mut txn = self.write_txn()?;
        let current: Option<UserRecord> = match self.users_db.get(&txn, key).map_err(heed_err)? {
            Some(bytes) => Some(decode(bytes)?),
            None => None,
        };
        let updated = apply(current);
        self.users_db
            .put(&mut txn, key, encode(&updated)?.as_slice())
            .map_err(heed_err)?;
        commit(txn)?;
        Ok(updated)
    }

    fn user_count(&self) -> Result<u64, StoreError> {
        let txn = self.read_txn()?;
        self.users_db.len(&txn).map_err(heed_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{temp_env, wallet, BUYER};
    use souk_types::Timestamp;

    #[test]
    fn unseen_wallet_is_none() {
        let (_dir, env) = temp_env();
        assert_eq!(env.get_user(&wallet(BUYER)).unwrap(), None);
        assert_eq!(env.user_count().unwrap(), 0);
    }

    #[test]
    fn update_creates_then_modifies() {
        let (_dir, env) = temp_env();
        let w = wallet(BUYER);

        let created = env
            .update_user(&w, &mut |current| {
                assert!(current.is_none());
                UserRecord::new(w.clone(), Timestamp::new(10))
            })
            .unwrap();
        assert!(!created.has_accepted_tos);

        env.update_user(&w, &mut |current| {
            let mut user = current.expect("user exists");
            user.has_accepted_tos = true;
            user.tos_accepted_at = Some(Timestamp::new(20));
            user
        })
        .unwrap();

        let stored = env.get_user(&w).unwrap().unwrap();
        assert!(stored.has_accepted_tos);
        assert_eq!(stored.created_at, Timestamp::new(10));
        assert_eq!(env.user_count().unwrap(), 1);
    }
}
