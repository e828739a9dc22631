//! Error types for utxo-pir-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Record too short: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

/// Address could not be turned into a search key
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Failed to determine address type of {address}: {}", reasons.join("; "))]
    Unrecognized {
        address: String,
        /// One entry per decoder that rejected the input, in trial order
        reasons: Vec<String>,
    },

    #[error("Search key must be 20 or 32 bytes, got {0}")]
    InvalidKeyLength(usize),
}
