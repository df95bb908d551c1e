//! Signed, expiring admin session tokens.
//!
//! Token layout: `<subject>.<expires_at_secs>.<hex hmac-sha256>`, where the
//! MAC covers `<subject>.<expires_at_secs>`. Tokens are stateless: any node
//! holding the same secret can verify them.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use souk_types::Timestamp;
use zeroize::Zeroizing;

use crate::kdf::{derive_key, SESSION_KEY_DOMAIN};
use crate::CryptoError;

type HmacSha256 = Hmac<Sha256>;

pub struct SessionSigner {
    key: Zeroizing<[u8; 32]>,
}

impl SessionSigner {
    pub fn new(secret: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self {
            key: derive_key(secret, SESSION_KEY_DOMAIN)?,
        })
    }

    fn mac(&self) -> HmacSha256 {
        <HmacSha256 as Mac>::new_from_slice(self.key.as_slice()).expect("HMAC takes any key length")
    }

    /// Issue a token for `subject` valid until `expires_at`.
    ///
    /// `subject` must not contain `.`.
    pub fn issue(&self, subject: &str, expires_at: Timestamp) -> Result<String, CryptoError> {
        if subject.is_empty() || subject.contains('.') {
            return Err(CryptoError::MalformedToken);
        }
        let body = format!("{subject}.{}", expires_at.as_secs());
        let mut mac = self.mac();
        mac.update(body.as_bytes());
        let tag = mac.finalize().into_bytes();
        Ok(format!("{body}.{}", hex::encode(tag)))
    }

    /// Verify a token and return its subject.
    pub fn verify(&self, token: &str, now: Timestamp) -> Result<String, CryptoError> {
        let (body, tag_hex) = token.rsplit_once('.').ok_or(CryptoError::MalformedToken)?;
        let (subject, expires) = body.split_once('.').ok_or(CryptoError::MalformedToken)?;
        let expires_at = expires
            .parse::<u64>()
            .map(Timestamp::new)
            .map_err(|_| CryptoError::MalformedToken)?;
        let tag = hex::decode(tag_hex).map_err(|_| CryptoError::MalformedToken)?;

        let mut mac = self.mac();
        mac.update(body.as_bytes());
        mac.verify_slice(&tag).map_err(|_| CryptoError::BadSignature)?;

        if now >= expires_at {
            return Err(CryptoError::Expired);
        }
        Ok(subject.to_string())
    }

    /// Compare a presented secret against the expected one in constant time.
    pub fn secrets_match(&self, expected: &str, presented: &str) -> bool {
        let mut expected_mac = self.mac();
        expected_mac.update(expected.as_bytes());
        let expected_tag = expected_mac.finalize().into_bytes();

        let mut presented_mac = self.mac();
        presented_mac.update(presented.as_bytes());
        presented_mac.verify_slice(&expected_tag).is_ok()
    }
}
