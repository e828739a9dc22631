//! Transparent PIR engine for tests and local mock servers
//!
//! Selectors carry the plain position and replies carry the plain record,
//! so a mock server can answer them without any cryptography. Nothing here
//! is private.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use rand::RngCore;

use crate::pir::{
    shape_capacity, PirEngine, PirError, PrivateKey, PublicKey, Reply, Selector, SelectorFactory,
};

const TAG_PUBLIC: u8 = 0x01;
const TAG_FAST: u8 = 0x02;

#[derive(Debug, Clone, Copy, Default)]
pub struct TransparentEngine;

impl TransparentEngine {
    pub fn new() -> Self {
        Self
    }

    /// Position named by a selector, as a mock server would read it
    pub fn selected_index(selector: &[u8]) -> Option<u64> {
        match selector {
            [TAG_PUBLIC | TAG_FAST, rest @ ..] if rest.len() == 8 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(rest);
                Some(u64::from_le_bytes(buf))
            }
            _ => None,
        }
    }

    /// Whether the selector came from the private-key path
    pub fn is_fast(selector: &[u8]) -> bool {
        selector.first() == Some(&TAG_FAST)
    }

    /// Wrap a plaintext record as a reply
    pub fn reply(plaintext: &[u8]) -> Reply {
        Reply(plaintext.to_vec())
    }

    fn encode(tag: u8, index_counts: &[u64], idx: u64) -> Result<Selector, PirError> {
        if idx >= shape_capacity(index_counts) {
            return Err(PirError::IndexOutOfShape {
                idx,
                index_counts: index_counts.to_vec(),
            });
        }
        let mut bytes = Vec::with_capacity(9);
        bytes.push(tag);
        bytes.extend_from_slice(&idx.to_le_bytes());
        Ok(Selector(bytes))
    }
}

impl PirEngine for TransparentEngine {
    fn create_private_key(&self) -> PrivateKey {
        let mut key = vec![0u8; 16];
        rand::thread_rng().fill_bytes(&mut key);
        PrivateKey(key)
    }

    fn create_public_key(&self, private_key: &PrivateKey) -> PublicKey {
        PublicKey(private_key.0.iter().rev().copied().collect())
    }

    fn create_selector(
        &self,
        _public_key: &PublicKey,
        index_counts: &[u64],
        idx: u64,
    ) -> Result<Selector, PirError> {
        Self::encode(TAG_PUBLIC, index_counts, idx)
    }

    fn create_selector_fast(
        &self,
        _private_key: &PrivateKey,
        index_counts: &[u64],
        idx: u64,
    ) -> Result<Selector, PirError> {
        Self::encode(TAG_FAST, index_counts, idx)
    }

    fn decrypt_reply(
        &self,
        _private_key: &PrivateKey,
        _dimension: u32,
        _packing: u32,
        reply: &Reply,
    ) -> Result<Vec<u8>, PirError> {
        Ok(reply.0.clone())
    }
}

/// Selector factory that counts draws and refills
#[derive(Debug, Clone, Default)]
pub struct CountingSelectorFactory {
    created: Arc<AtomicUsize>,
    fills: Arc<AtomicUsize>,
    fail_fill: bool,
}

impl CountingSelectorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory whose every refill fails
    pub fn failing_fill() -> Self {
        Self {
            fail_fill: true,
            ..Self::default()
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn fills(&self) -> usize {
        self.fills.load(Ordering::SeqCst)
    }
}

impl SelectorFactory for CountingSelectorFactory {
    fn create(&self, index_counts: &[u64], idx: u64) -> Result<Selector, PirError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        TransparentEngine::encode(TAG_FAST, index_counts, idx)
    }

    fn fill(&self) -> BoxFuture<'static, Result<(), PirError>> {
        self.fills.fetch_add(1, Ordering::SeqCst);
        if self.fail_fill {
            Box::pin(future::ready(Err(PirError::FactoryExhausted)))
        } else {
            Box::pin(future::ready(Ok(())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_roundtrip_through_mock_server() {
        let engine = TransparentEngine::new();
        let sk = engine.create_private_key();
        let pk = engine.create_public_key(&sk);

        let slow = engine.create_selector(&pk, &[10, 10], 42).unwrap();
        let fast = engine.create_selector_fast(&sk, &[10, 10], 42).unwrap();
        assert_eq!(TransparentEngine::selected_index(&slow.0), Some(42));
        assert_eq!(TransparentEngine::selected_index(&fast.0), Some(42));
        assert!(!TransparentEngine::is_fast(&slow.0));
        assert!(TransparentEngine::is_fast(&fast.0));
    }

    #[test]
    fn test_index_outside_shape() {
        let engine = TransparentEngine::new();
        let sk = engine.create_private_key();
        let err = engine.create_selector_fast(&sk, &[4, 4], 16).unwrap_err();
        assert_eq!(
            err,
            PirError::IndexOutOfShape {
                idx: 16,
                index_counts: vec![4, 4]
            }
        );
    }

    #[test]
    fn test_malformed_selector_is_rejected() {
        assert_eq!(TransparentEngine::selected_index(&[]), None);
        assert_eq!(TransparentEngine::selected_index(&[TAG_FAST, 1, 2]), None);
        assert_eq!(TransparentEngine::selected_index(&[0x7f; 9]), None);
    }
}
