//! utxo-pir-client: private UTXO lookups over a PIR-backed index
//!
//! Finds the UTXOs of an address in a remote sorted index without telling
//! the server which address is being looked up:
//!
//! 1. decode the address into a search key
//! 2. interpolation-search the `address` view, one PIR probe per step
//! 3. read the `(begin, count)` range for the found position
//! 4. fetch every `find` record in that range concurrently
//!
//! Authenticated requests are signed with a strictly increasing nonce from a
//! [`NonceCoordinator`], which may be shared across processes.

pub mod auth;
pub mod client;
pub mod error;
pub mod locator;
pub mod metrics;
pub mod nonce;
pub mod pir;
pub mod search;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use auth::AuthSigner;
pub use client::{ApiClient, ApiClientBuilder, MISSING_BODY};
pub use error::{ClientError, LockError, Result};
pub use locator::Locator;
pub use nonce::{
    DistributedNonce, LeaseSettings, LeaseStore, LocalNonce, LockToken, MemoryLeaseStore,
    NonceCoordinator,
};
#[cfg(feature = "redis")]
pub use nonce::RedisLeaseStore;
pub use pir::{PirEngine, PirError, PrivateKey, PublicKey, Reply, Selector, SelectorFactory};
pub use search::{interpolation_search, SearchOutcome};
