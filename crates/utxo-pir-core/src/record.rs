//! Plaintext layouts of the three remote views
//!
//! All integers are little-endian except the address-view hint, which is
//! the first four key bytes read big-endian (see [`crate::hint_of`]).

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Size of a decrypted `range` record
pub const RANGE_RECORD_SIZE: usize = 8;

/// Size of a decrypted `find` record
pub const UTXO_RECORD_SIZE: usize = 44;

/// Shape of one PIR-backed view, as served by `pub/utxoSetInfo`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDescriptor {
    /// Block height the view was built at
    pub height: u64,
    /// Number of records in the view
    #[serde(rename = "elemCount", alias = "elementCount")]
    pub element_count: u64,
    /// Per-dimension index counts; the selector shape
    pub index_counts: Vec<u64>,
    pub dimension: u32,
    pub packing: u32,
}

/// `range` record: where the UTXOs of one sorted key live in the `find` view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeRecord {
    pub begin: u32,
    pub count: u32,
}

impl RangeRecord {
    pub fn new(begin: u32, count: u32) -> Self {
        Self { begin, count }
    }

    pub fn to_bytes(&self) -> [u8; RANGE_RECORD_SIZE] {
        let mut buf = [0u8; RANGE_RECORD_SIZE];
        buf[0..4].copy_from_slice(&self.begin.to_le_bytes());
        buf[4..8].copy_from_slice(&self.count.to_le_bytes());
        buf
    }

    /// Parse from a decrypted reply; trailing padding is ignored
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.len() < RANGE_RECORD_SIZE {
            return Err(Error::Truncated {
                expected: RANGE_RECORD_SIZE,
                actual: data.len(),
            });
        }

        Ok(Self {
            begin: read_u32_le(&data[0..4]),
            count: read_u32_le(&data[4..8]),
        })
    }

    /// Positions in the `find` view, `[begin, begin + count)`
    pub fn positions(&self) -> std::ops::Range<u64> {
        let begin = self.begin as u64;
        begin..begin + self.count as u64
    }
}

/// One unspent output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoEntry {
    /// Transaction id, in the byte order the server stores it
    #[serde(with = "hex::serde")]
    pub txid: [u8; 32],
    pub vout: u32,
    /// Amount in satoshis
    pub value: u64,
}

impl UtxoEntry {
    pub fn new(txid: [u8; 32], vout: u32, value: u64) -> Self {
        Self { txid, vout, value }
    }

    pub fn to_bytes(&self) -> [u8; UTXO_RECORD_SIZE] {
        let mut buf = [0u8; UTXO_RECORD_SIZE];
        buf[0..32].copy_from_slice(&self.txid);
        buf[32..36].copy_from_slice(&self.vout.to_le_bytes());
        buf[36..44].copy_from_slice(&self.value.to_le_bytes());
        buf
    }

    /// Parse from a decrypted reply; trailing padding is ignored
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.len() < UTXO_RECORD_SIZE {
            return Err(Error::Truncated {
                expected: UTXO_RECORD_SIZE,
                actual: data.len(),
            });
        }

        let mut txid = [0u8; 32];
        txid.copy_from_slice(&data[0..32]);
        let mut value = [0u8; 8];
        value.copy_from_slice(&data[36..44]);

        Ok(Self {
            txid,
            vout: read_u32_le(&data[32..36]),
            value: u64::from_le_bytes(value),
        })
    }

    /// Txid as hex, bytes in stored order
    pub fn txid_hex(&self) -> String {
        hex::encode(self.txid)
    }
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}
