use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("secret must not be empty")]
    EmptySecret,

    #[error("random source unavailable: {0}")]
    Random(String),

    #[error("sealed payload is too short")]
    Truncated,

    #[error("decryption failed: authentication check failed")]
    Authentication,

    #[error("decrypted payload is not valid UTF-8")]
    Encoding,

    #[error("malformed session token")]
    MalformedToken,

    #[error("session token signature mismatch")]
    BadSignature,

    #[error("session token expired")]
    Expired,
}
