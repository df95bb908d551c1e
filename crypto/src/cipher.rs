//! Encryption of delivery payloads at rest.
//!
//! ChaCha20-Poly1305 AEAD with a random 96-bit nonce per seal. The symmetric
//! key is derived from the configured delivery secret with Blake2b and a
//! domain separator. The listing id is bound as associated data, so a sealed
//! payload cannot be moved onto another listing's record.
//!
//! Sealed layout: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use zeroize::Zeroizing;

use crate::kdf::{derive_key, DELIVERY_KEY_DOMAIN};
use crate::CryptoError;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

pub struct PayloadCipher {
    key: Zeroizing<[u8; 32]>,
}

impl PayloadCipher {
    /// Derive the cipher key from an operator-supplied secret.
    pub fn from_secret(secret: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self {
            key: derive_key(secret, DELIVERY_KEY_DOMAIN)?,
        })
    }

    /// Encrypt `plaintext`, binding it to `context` (the owning listing id).
    pub fn seal(&self, context: &[u8], plaintext: &str) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        getrandom::getrandom(&mut nonce_bytes).map_err(|e| CryptoError::Random(e.to_string()))?;

        let cipher = ChaCha20Poly1305::new_from_slice(&self.key[..])
            .map_err(|_| CryptoError::Authentication)?;
        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: context,
                },
            )
            .map_err(|_| CryptoError::Authentication)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypt a payload produced by [`PayloadCipher::seal`] with the same context.
    pub fn open(&self, context: &[u8], sealed: &[u8]) -> Result<String, CryptoError> {
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::Truncated);
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);

        let cipher = ChaCha20Poly1305::new_from_slice(&self.key[..])
            .map_err(|_| CryptoError::Authentication)?;
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload {
                    msg: ciphertext,
                    aad: context,
                },
            )
            .map_err(|_| CryptoError::Authentication)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::Encoding)
    }
}

impl std::fmt::Debug for PayloadCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PayloadCipher(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://github.com/seller/private-repo/releases/download/v1.0.0/bot.zip";

    #[test]
    fn seal_open_roundtrip() {
        let cipher = PayloadCipher::from_secret(b"operator secret").unwrap();
        let sealed = cipher.seal(b"listing-1", URL).unwrap();

        assert_eq!(sealed.len(), NONCE_LEN + URL.len() + TAG_LEN);
        assert!(!sealed.windows(URL.len()).any(|w| w == URL.as_bytes()));
        assert_eq!(cipher.open(b"listing-1", &sealed).unwrap(), URL);
    }

    #[test]
    fn nonces_are_fresh() {
        let cipher = PayloadCipher::from_secret(b"operator secret").unwrap();
        let a = cipher.seal(b"ctx", URL).unwrap();
        let b = cipher.seal(b"ctx", URL).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_context_fails_authentication() {
        let cipher = PayloadCipher::from_secret(b"operator secret").unwrap();
        let sealed = cipher.seal(b"listing-1", URL).unwrap();
        assert!(matches!(
            cipher.open(b"listing-2", &sealed),
            Err(CryptoError::Authentication)
        ));
    }

    #[test]
    fn wrong_secret_fails_authentication() {
        let sealed = PayloadCipher::from_secret(b"one")
            .unwrap()
            .seal(b"ctx", URL)
            .unwrap();
        let other = PayloadCipher::from_secret(b"two").unwrap();
        assert!(other.open(b"ctx", &sealed).is_err());
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let cipher = PayloadCipher::from_secret(b"operator secret").unwrap();
        let mut sealed = cipher.seal(b"ctx", URL).unwrap();
        sealed[NONCE_LEN] ^= 0xFF;
        assert!(cipher.open(b"ctx", &sealed).is_err());
    }

    #[test]
    fn truncated_and_empty_secret() {
        let cipher = PayloadCipher::from_secret(b"operator secret").unwrap();
        assert!(matches!(cipher.open(b"ctx", &[0u8; 10]), Err(CryptoError::Truncated)));
        assert!(matches!(
            PayloadCipher::from_secret(b""),
            Err(CryptoError::EmptySecret)
        ));
    }
}
