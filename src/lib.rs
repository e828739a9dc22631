//! utxo-pir: private UTXO lookups over a PIR-backed remote index
//!
//! Umbrella crate re-exporting the data model and the network client.

pub use utxo_pir_client;
pub use utxo_pir_core;

pub use utxo_pir_client::{ApiClient, Locator, NonceCoordinator};
pub use utxo_pir_core::{decode_address, ClientConfig, UtxoEntry};
