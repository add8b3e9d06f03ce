use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Wallet not connected")]
    NotConnected,

    #[error("Wrong network: expected chain {expected}, connected to chain {actual}")]
    WrongNetwork { expected: u64, actual: u64 },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transaction rejected: {0}")]
    Rejected(String),

    #[error("Execution reverted: {0}")]
    Reverted(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl From<reqwest::Error> for ChainError {
    fn from(e: reqwest::Error) -> Self {
        ChainError::Connection(e.to_string())
    }
}

impl From<alloy_sol_types::Error> for ChainError {
    fn from(e: alloy_sol_types::Error) -> Self {
        ChainError::Decode(e.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(e: serde_json::Error) -> Self {
        ChainError::Decode(e.to_string())
    }
}

/// Caught locally, before anything reaches the network.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount {0} has more than 18 decimal places")]
    TooPrecise(String),

    #[error("Amount {amount} is below the minimum stake of {minimum}")]
    BelowMinimum { amount: String, minimum: String },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

/// Outcome of a single record lookup.
///
/// `NotFound` means the contract answered and the record is absent (zeroed or
/// `exists = false`). `Failed` means we never got an answer.
#[derive(Debug)]
pub enum Fetch<T> {
    Found(T),
    NotFound,
    Failed(ChainError),
}

impl<T> Fetch<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Fetch::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<Option<T>, ChainError> {
        match self {
            Fetch::Found(value) => Ok(Some(value)),
            Fetch::NotFound => Ok(None),
            Fetch::Failed(e) => Err(e),
        }
    }
}

impl<T> From<Result<Option<T>, ChainError>> for Fetch<T> {
    fn from(result: Result<Option<T>, ChainError>) -> Self {
        match result {
            Ok(Some(value)) => Fetch::Found(value),
            Ok(None) => Fetch::NotFound,
            Err(e) => Fetch::Failed(e),
        }
    }
}
