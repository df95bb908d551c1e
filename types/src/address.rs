//! Wallet address type.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// Base58 alphabet used by the payment network (no `0`, `O`, `I`, `l`).
const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// A base58-encoded wallet address (32-byte public key, 32 to 44 characters).
///
/// Construction always validates the format, so a `WalletAddress` held by any
/// record is known to be well-formed. Ownership of the key is never checked here.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    pub const MIN_LEN: usize = 32;
    pub const MAX_LEN: usize = 44;

    /// Parse and validate a wallet address.
    pub fn parse(raw: impl Into<String>) -> Result<Self, TypesError> {
        let s = raw.into();
        if Self::is_well_formed(&s) {
            Ok(Self(s))
        } else {
            Err(TypesError::InvalidAddress(s))
        }
    }

    /// Whether `s` has the shape of an address: correct length, base58 only.
    pub fn is_well_formed(s: &str) -> bool {
        (Self::MIN_LEN..=Self::MAX_LEN).contains(&s.len())
            && s.chars().all(|c| BASE58_ALPHABET.contains(c))
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<WalletAddress> for String {
    fn from(addr: WalletAddress) -> Self {
        addr.0
    }
}
