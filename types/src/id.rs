//! Opaque record identifiers.
//!
//! Every persisted record is keyed by a random 12-byte id rendered as 24
//! lowercase hex characters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name([u8; 12]);

        impl $name {
            pub const LEN: usize = 12;

            pub fn new(bytes: [u8; 12]) -> Self {
                Self(bytes)
            }

            /// Draw a fresh id from the operating system's random source.
            pub fn generate() -> Self {
                let mut bytes = [0u8; 12];
                getrandom::getrandom(&mut bytes).expect("OS random source unavailable");
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 12] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut bytes = [0u8; 12];
                hex::decode_to_slice(s, &mut bytes)
                    .map_err(|_| TypesError::InvalidId(s.to_string()))?;
                Ok(Self(bytes))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }
    };
}

record_id!(
    /// Identifier of a marketplace listing.
    ListingId
);
record_id!(
    /// Identifier of a recorded purchase.
    TransactionId
);
record_id!(
    /// Identifier of an abuse report.
    ReportId
);
record_id!(LogId);
