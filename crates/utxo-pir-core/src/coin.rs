//! Coin, address type and view identifiers used in API paths

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Chain whose UTXO set is indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coin {
    /// Bitcoin mainnet
    Btc,
    /// Bitcoin testnet
    Tbtc,
}

impl Coin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Coin::Btc => "btc",
            Coin::Tbtc => "tbtc",
        }
    }
}

/// Script template of an address; each type has its own sorted index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddrType {
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
}

impl AddrType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddrType::P2pkh => "p2pkh",
            AddrType::P2sh => "p2sh",
            AddrType::P2wpkh => "p2wpkh",
            AddrType::P2wsh => "p2wsh",
        }
    }

    /// Length in bytes of the search key for this address type
    pub fn key_len(&self) -> usize {
        match self {
            AddrType::P2wsh => 32,
            _ => 20,
        }
    }
}

/// One of the three PIR-backed views served per `(coin, addrType)`
///
/// - Address: sorted search keys
/// - Range: `(begin, count)` into the find view, per sorted position
/// - Find: flat UTXO records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Address,
    Range,
    Find,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Address => "address",
            SearchType::Range => "range",
            SearchType::Find => "find",
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for AddrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Coin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "btc" => Ok(Coin::Btc),
            "tbtc" => Ok(Coin::Tbtc),
            _ => Err(Error::UnknownIdentifier(format!("coin: {}", s))),
        }
    }
}

impl FromStr for AddrType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "p2pkh" => Ok(AddrType::P2pkh),
            "p2sh" => Ok(AddrType::P2sh),
            "p2wpkh" => Ok(AddrType::P2wpkh),
            "p2wsh" => Ok(AddrType::P2wsh),
            _ => Err(Error::UnknownIdentifier(format!("address type: {}", s))),
        }
    }
}

impl FromStr for SearchType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "address" => Ok(SearchType::Address),
            "range" => Ok(SearchType::Range),
            "find" => Ok(SearchType::Find),
            _ => Err(Error::UnknownIdentifier(format!("search type: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_serialization() {
        assert_eq!(serde_json::to_string(&Coin::Btc).unwrap(), "\"btc\"");
        assert_eq!(serde_json::to_string(&Coin::Tbtc).unwrap(), "\"tbtc\"");
        assert_eq!(serde_json::from_str::<Coin>("\"tbtc\"").unwrap(), Coin::Tbtc);
    }

    #[test]
    fn test_display_matches_path_segments() {
        assert_eq!(AddrType::P2wpkh.to_string(), "p2wpkh");
        assert_eq!(SearchType::Range.to_string(), "range");
        assert_eq!(Coin::Btc.to_string(), "btc");
    }

    #[test]
    fn test_parse_identifiers() {
        assert_eq!("BTC".parse::<Coin>().unwrap(), Coin::Btc);
        assert_eq!("p2sh".parse::<AddrType>().unwrap(), AddrType::P2sh);
        assert_eq!("find".parse::<SearchType>().unwrap(), SearchType::Find);
        assert!("ltc".parse::<Coin>().is_err());
        assert!("p2tr".parse::<AddrType>().is_err());
    }

    #[test]
    fn test_key_len() {
        assert_eq!(AddrType::P2pkh.key_len(), 20);
        assert_eq!(AddrType::P2wsh.key_len(), 32);
    }
}
