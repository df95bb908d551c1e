use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
