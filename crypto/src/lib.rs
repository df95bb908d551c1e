//! Cryptographic primitives for the Souk marketplace.
//!
//! - **Blake2b** for key derivation from configured secrets
//! - **ChaCha20-Poly1305** for delivery payloads at rest
//! - **HMAC-SHA256** for admin session tokens

pub mod cipher;
pub mod error;
pub mod kdf;
pub mod session;

pub use cipher::PayloadCipher;
pub use error::CryptoError;
pub use kdf::derive_key;
pub use session::SessionSigner;
