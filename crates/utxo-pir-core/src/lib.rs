//! utxo-pir-core: data model for private UTXO lookups over PIR
//!
//! The remote service keeps, per `(coin, addrType)`, three PIR-backed views:
//! - `address`: search keys in sorted order
//! - `range`: for each sorted position, where its UTXOs start and how many
//! - `find`: the flat UTXO records
//!
//! A client locates a key by probing the `address` view, then reads one
//! `range` record and fans out over the `find` view. The server only ever
//! sees opaque selectors and replies.
//!
//! # What the Server Learns
//!
//! | Information | Server Knowledge |
//! |-------------|------------------|
//! | Coin and address type | **YES** - part of the request path |
//! | View being queried | **YES** - part of the request path |
//! | Probe positions, plaintexts | NO - encrypted by PIR |
//! | Number and timing of probes | **YES** - varies with key position |
//! | Number of UTXOs for the key | **YES** - one `find` query per UTXO |
//!
//! The probe count of the interpolation search depends on where the key
//! sits in the index, so it leaks some positional information. No
//! constant-round padding is attempted.
//!
//! This crate does no I/O besides config files; see `utxo-pir-client`.

mod address;
mod api;
mod coin;
mod config;
mod error;
mod record;

pub use address::{
    decode_address, hint_of, AddressCodec, AddressDecoder, Base58CheckDecoder, DecodeOutcome,
    DecodedAddress, SearchKey, SegwitDecoder,
};
pub use api::{
    ApiResponse, CoinsResponse, QueryRequest, QueryResponse, HEADER_API_ID, HEADER_NONCE,
    HEADER_SIGNATURE, PRIVATE_PREFIX, PUBLIC_PREFIX,
};
pub use coin::{AddrType, Coin, SearchType};
pub use config::{ClientConfig, NonceBackend, DEFAULT_ENDPOINT, DEFAULT_NONCE_KEY};
pub use error::{DecodeError, Error};
pub use record::{IndexDescriptor, RangeRecord, UtxoEntry, RANGE_RECORD_SIZE, UTXO_RECORD_SIZE};

pub type Result<T> = std::result::Result<T, Error>;
