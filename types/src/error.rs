//! Parse errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid record id: {0}")]
    InvalidId(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("unknown risk level: {0}")]
    UnknownRiskLevel(String),

    #[error("invalid listing state: state={state}, approved={approved}")]
    InvalidState { state: String, approved: bool },
}
