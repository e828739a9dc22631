//! PIR engine and selector-factory capabilities
//!
//! Key generation, selector encryption and reply decryption are provided by
//! an external engine. This module only fixes the interface the locator
//! consumes, plus the opaque byte containers that cross it.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::future::BoxFuture;
use thiserror::Error;

/// Failure inside the PIR engine or selector factory
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PirError {
    #[error("PIR error: {0}")]
    Engine(String),

    #[error("Selector index {idx} outside shape {index_counts:?}")]
    IndexOutOfShape { idx: u64, index_counts: Vec<u64> },

    #[error("Selector factory exhausted")]
    FactoryExhausted,
}

/// Client secret; never leaves the process
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(pub Vec<u8>);

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Public half of the client key pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(pub Vec<u8>);

/// Opaque encrypted query naming one position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector(pub Vec<u8>);

impl Selector {
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.0)
    }
}

/// Opaque encrypted answer; only the private-key holder can decrypt it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply(pub Vec<u8>);

impl Reply {
    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        BASE64.decode(encoded).map(Reply)
    }
}

/// Cryptographic primitives of the PIR scheme
pub trait PirEngine: Send + Sync {
    fn create_private_key(&self) -> PrivateKey;

    fn create_public_key(&self, private_key: &PrivateKey) -> PublicKey;

    /// Encrypt a selector for `idx` under the public key
    fn create_selector(
        &self,
        public_key: &PublicKey,
        index_counts: &[u64],
        idx: u64,
    ) -> Result<Selector, PirError>;

    /// Same opacity to the server, derived directly from the private key
    fn create_selector_fast(
        &self,
        private_key: &PrivateKey,
        index_counts: &[u64],
        idx: u64,
    ) -> Result<Selector, PirError>;

    fn decrypt_reply(
        &self,
        private_key: &PrivateKey,
        dimension: u32,
        packing: u32,
        reply: &Reply,
    ) -> Result<Vec<u8>, PirError>;
}

/// Buffer of selectors prepared ahead of need
///
/// `create` hands out a buffered selector without blocking; `fill`
/// restocks the buffer. The locator spawns `fill` after every draw and
/// never awaits it.
pub trait SelectorFactory: Send + Sync {
    fn create(&self, index_counts: &[u64], idx: u64) -> Result<Selector, PirError>;

    fn fill(&self) -> BoxFuture<'static, Result<(), PirError>>;
}

/// Total number of addressable positions for a selector shape
pub fn shape_capacity(index_counts: &[u64]) -> u64 {
    index_counts.iter().fold(1u64, |acc, &n| acc.saturating_mul(n))
}
