//! Key derivation from operator-supplied secrets.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use zeroize::Zeroizing;

use crate::CryptoError;

type Blake2b256 = Blake2b<U32>;

/// Domain for the delivery-payload cipher key.
pub const DELIVERY_KEY_DOMAIN: &[u8] = b"souk-delivery-payload";
/// Domain for the admin session MAC key.
pub const SESSION_KEY_DOMAIN: &[u8] = b"souk-admin-session";

/// Derive a 256-bit key bound to `domain`.
///
/// The domain is length-prefixed so that `("ab", "c")` and `("a", "bc")`
/// never yield the same key.
pub fn derive_key(secret: &[u8], domain: &[u8]) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    if secret.is_empty() {
        return Err(CryptoError::EmptySecret);
    }
    let mut hasher = Blake2b256::new();
    hasher.update((domain.len() as u64).to_le_bytes());
    hasher.update(domain);
    hasher.update(secret);

    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&hasher.finalize());
    Ok(key)
}
