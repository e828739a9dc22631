//! Address decoding: address string -> (coin, address type, search key)
//!
//! Decoders are tried in order and the first one that recognizes the input
//! wins. Base58Check is tried before segwit; when every decoder rejects the
//! input the individual rejection reasons are reported together.
//!
//! Witness version 1 (taproot) is recognized by the segwit encoding but is
//! not served by the index, so it is rejected here.

use std::fmt;

use crate::coin::{AddrType, Coin};
use crate::error::DecodeError;

/// Sort key of the `address` view: a 20- or 32-byte script hash
///
/// Ordering is byte-wise, most significant byte first.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SearchKey(Vec<u8>);

impl SearchKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, DecodeError> {
        let bytes = bytes.into();
        match bytes.len() {
            20 | 32 => Ok(Self(bytes)),
            n => Err(DecodeError::InvalidKeyLength(n)),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Interpolation hint: the first four bytes as a big-endian integer
    pub fn hint(&self) -> u32 {
        hint_of(&self.0)
    }
}

impl fmt::Debug for SearchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SearchKey({})", hex::encode(&self.0))
    }
}

impl AsRef<[u8]> for SearchKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// First four bytes of `bytes` read as big-endian, zero-padded if shorter
pub fn hint_of(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    let n = bytes.len().min(4);
    buf[..n].copy_from_slice(&bytes[..n]);
    u32::from_be_bytes(buf)
}

/// Result of decoding an address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAddress {
    pub coin: Coin,
    pub addr_type: AddrType,
    pub key: SearchKey,
}

/// Outcome of a single decoder attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    Decoded(DecodedAddress),
    Unrecognized(String),
}

/// One address encoding
pub trait AddressDecoder: Send + Sync {
    fn name(&self) -> &'static str;

    fn decode(&self, address: &str) -> DecodeOutcome;
}

/// Legacy Base58Check addresses (P2PKH / P2SH)
pub struct Base58CheckDecoder;

impl AddressDecoder for Base58CheckDecoder {
    fn name(&self) -> &'static str {
        "base58check"
    }

    fn decode(&self, address: &str) -> DecodeOutcome {
        let payload = match bs58::decode(address).with_check(None).into_vec() {
            Ok(payload) => payload,
            Err(e) => return DecodeOutcome::Unrecognized(e.to_string()),
        };

        if payload.len() != 21 {
            return DecodeOutcome::Unrecognized(format!(
                "payload is {} bytes, expected 21",
                payload.len()
            ));
        }

        let (coin, addr_type) = match payload[0] {
            0x00 => (Coin::Btc, AddrType::P2pkh),
            0x05 => (Coin::Btc, AddrType::P2sh),
            0x6f => (Coin::Tbtc, AddrType::P2pkh),
            0xc4 => (Coin::Tbtc, AddrType::P2sh),
            v => return DecodeOutcome::Unrecognized(format!("unknown version byte 0x{:02x}", v)),
        };

        match SearchKey::new(&payload[1..]) {
            Ok(key) => DecodeOutcome::Decoded(DecodedAddress { coin, addr_type, key }),
            Err(e) => DecodeOutcome::Unrecognized(e.to_string()),
        }
    }
}

/// Native segwit addresses (P2WPKH / P2WSH), witness version 0 only
pub struct SegwitDecoder;

impl AddressDecoder for SegwitDecoder {
    fn name(&self) -> &'static str {
        "segwit"
    }

    fn decode(&self, address: &str) -> DecodeOutcome {
        let (hrp, version, program) = match bech32::segwit::decode(address) {
            Ok(decoded) => decoded,
            Err(e) => return DecodeOutcome::Unrecognized(e.to_string()),
        };

        let coin = match hrp.to_lowercase().as_str() {
            "bc" => Coin::Btc,
            "tb" => Coin::Tbtc,
            other => return DecodeOutcome::Unrecognized(format!("unknown prefix {}", other)),
        };

        if version.to_u8() != 0 {
            return DecodeOutcome::Unrecognized(format!(
                "unsupported witness version {}",
                version.to_u8()
            ));
        }

        let addr_type = match program.len() {
            20 => AddrType::P2wpkh,
            32 => AddrType::P2wsh,
            n => {
                return DecodeOutcome::Unrecognized(format!("witness program is {} bytes", n))
            }
        };

        match SearchKey::new(program) {
            Ok(key) => DecodeOutcome::Decoded(DecodedAddress { coin, addr_type, key }),
            Err(e) => DecodeOutcome::Unrecognized(e.to_string()),
        }
    }
}

/// Ordered list of decoders
pub struct AddressCodec {
    decoders: Vec<Box<dyn AddressDecoder>>,
}

impl AddressCodec {
    /// Base58Check first, then segwit
    pub fn new() -> Self {
        Self::with_decoders(vec![Box::new(Base58CheckDecoder), Box::new(SegwitDecoder)])
    }

    pub fn with_decoders(decoders: Vec<Box<dyn AddressDecoder>>) -> Self {
        Self { decoders }
    }

    pub fn decode(&self, address: &str) -> Result<DecodedAddress, DecodeError> {
        let mut reasons = Vec::with_capacity(self.decoders.len());

        for decoder in &self.decoders {
            match decoder.decode(address) {
                DecodeOutcome::Decoded(decoded) => return Ok(decoded),
                DecodeOutcome::Unrecognized(reason) => {
                    reasons.push(format!("{}: {}", decoder.name(), reason));
                }
            }
        }

        Err(DecodeError::Unrecognized {
            address: address.to_string(),
            reasons,
        })
    }
}

impl Default for AddressCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode with the standard decoder chain
pub fn decode_address(address: &str) -> Result<DecodedAddress, DecodeError> {
    AddressCodec::new().decode(address)
}
