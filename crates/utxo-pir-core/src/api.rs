//! Wire types of the remote index API
//!
//! Every endpoint answers with the same envelope: `{ "error"?: string, "data": T }`.

use serde::{Deserialize, Serialize};

/// Public endpoints live under this prefix
pub const PUBLIC_PREFIX: &str = "pub/";

/// Authenticated endpoints live under this prefix
pub const PRIVATE_PREFIX: &str = "priv/";

pub const HEADER_NONCE: &str = "X-Nonce";
pub const HEADER_API_ID: &str = "X-API-ID";
pub const HEADER_SIGNATURE: &str = "X-Signature";

/// Response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            error: None,
            data: Some(data),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            data: None,
        }
    }
}

/// `GET pub/coins`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinsResponse {
    pub coins: Vec<String>,
}

/// `PUT priv/utxo/{coin}/{addrType}/{searchType}` request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Base64-encoded selector
    pub selector: String,
}

/// `PUT priv/utxo/...` response data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Base64-encoded reply
    pub reply: String,
}
