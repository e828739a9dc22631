//! Client error types

use thiserror::Error;

use crate::pir::PirError;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Address not recognized by any decoder; raised before any network call
    #[error(transparent)]
    Decode(#[from] utxo_pir_core::DecodeError),

    /// Non-success HTTP status; `message` is the envelope's `error` verbatim
    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Caller error or malformed response, e.g. a missing request body
    #[error("{0}")]
    Protocol(String),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Pir(#[from] PirError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid record: {0}")]
    Record(#[from] utxo_pir_core::Error),
}

/// Nonce coordinator failed to enter or leave its critical section
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("Nonce lock still held by another client after {attempts} attempts")]
    Contended { attempts: u32 },

    #[error("Nonce lease expired before it was released")]
    LeaseLost,

    #[error("Nonce store error: {0}")]
    Backend(String),
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for LockError {
    fn from(err: redis::RedisError) -> Self {
        LockError::Backend(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
