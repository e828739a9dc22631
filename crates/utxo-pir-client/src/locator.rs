//! Private UTXO lookup: address -> position -> range -> records

use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;

use utxo_pir_core::{
    AddrType, AddressCodec, ClientConfig, Coin, IndexDescriptor, RangeRecord, SearchKey,
    SearchType, UtxoEntry,
};

use crate::client::ApiClient;
use crate::error::{ClientError, Result};
use crate::metrics;
use crate::pir::{PirEngine, PrivateKey, PublicKey, Selector, SelectorFactory};
use crate::search::interpolation_search;

/// Locates the UTXOs of an address through PIR round trips only
///
/// Index descriptors are fetched fresh for every phase. Selectors come from
/// the injected [`SelectorFactory`] when one is set, otherwise they are built
/// on demand by the engine.
pub struct Locator {
    api: ApiClient,
    engine: Arc<dyn PirEngine>,
    private_key: PrivateKey,
    public_key: PublicKey,
    factory: Option<Arc<dyn SelectorFactory>>,
    codec: AddressCodec,
    fast: bool,
}

impl Locator {
    /// Locator with a freshly generated key pair
    pub fn new(api: ApiClient, engine: Arc<dyn PirEngine>) -> Self {
        let private_key = engine.create_private_key();
        Self::with_private_key(api, engine, private_key)
    }

    pub fn with_private_key(api: ApiClient, engine: Arc<dyn PirEngine>, private_key: PrivateKey) -> Self {
        let public_key = engine.create_public_key(&private_key);
        Self {
            api,
            engine,
            private_key,
            public_key,
            factory: None,
            codec: AddressCodec::new(),
            fast: false,
        }
    }

    /// Locator over a configured client; `fast_selectors` becomes the default mode
    pub async fn from_config(config: &ClientConfig, engine: Arc<dyn PirEngine>) -> Result<Self> {
        let api = ApiClient::from_config(config).await?;
        Ok(Self::new(api, engine).with_fast_selectors(config.fast_selectors))
    }

    /// Selector mode used by [`Locator::find`]
    pub fn with_fast_selectors(mut self, fast: bool) -> Self {
        self.fast = fast;
        self
    }

    pub fn fast_selectors(&self) -> bool {
        self.fast
    }

    pub fn with_selector_factory(mut self, factory: Arc<dyn SelectorFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn with_codec(mut self, codec: AddressCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// [`Locator::find_records`] with the configured selector mode
    pub async fn find(&self, address: &str) -> Result<Vec<UtxoEntry>> {
        self.find_records(address, self.fast).await
    }

    /// All UTXOs of `address`, ordered by position in the `find` view
    ///
    /// An address with no entry yields an empty list. An address no decoder
    /// recognizes fails before any request is made.
    pub async fn find_records(&self, address: &str, fast: bool) -> Result<Vec<UtxoEntry>> {
        let begin = Instant::now();
        let decoded = self.codec.decode(address)?;
        tracing::debug!(coin = %decoded.coin, addr_type = %decoded.addr_type, "Address decoded");

        let Some(loc) = self
            .find_location(decoded.coin, decoded.addr_type, &decoded.key, fast)
            .await?
        else {
            return Ok(Vec::new());
        };

        let range = self.range_at(decoded.coin, decoded.addr_type, loc, fast).await?;
        let utxos = self
            .utxos_in_range(decoded.coin, decoded.addr_type, range, fast)
            .await?;

        tracing::info!(
            utxos = utxos.len(),
            elapsed_ms = begin.elapsed().as_millis() as u64,
            "Lookup complete"
        );
        Ok(utxos)
    }

    /// Position of `key` in the `address` view, `None` if absent
    pub async fn find_location(
        &self,
        coin: Coin,
        addr_type: AddrType,
        key: &SearchKey,
        fast: bool,
    ) -> Result<Option<u64>> {
        let descriptor = self
            .api
            .get_index_descriptor(coin, addr_type, SearchType::Address)
            .await?;
        let begin = Instant::now();

        let outcome = interpolation_search(descriptor.element_count, key.as_bytes(), |idx| {
            self.probe_address(coin, addr_type, &descriptor, idx, key.len(), fast)
        })
        .await?;

        let elapsed = begin.elapsed();
        metrics::record_search(outcome.position.is_some(), elapsed);
        match outcome.position {
            Some(position) => tracing::info!(
                position,
                probes = outcome.probes,
                elapsed_ms = elapsed.as_millis() as u64,
                "Position found"
            ),
            None => tracing::info!(
                probes = outcome.probes,
                elapsed_ms = elapsed.as_millis() as u64,
                "Address not in index"
            ),
        }
        self.refill();
        Ok(outcome.position)
    }

    /// `(begin, count)` range in the `find` view for position `loc`
    pub async fn range_at(&self, coin: Coin, addr_type: AddrType, loc: u64, fast: bool) -> Result<RangeRecord> {
        let descriptor = self
            .api
            .get_index_descriptor(coin, addr_type, SearchType::Range)
            .await?;
        let plaintext = self
            .fetch(coin, addr_type, SearchType::Range, &descriptor, loc, fast)
            .await?;
        self.refill();
        Ok(RangeRecord::from_bytes(&plaintext)?)
    }

    /// Every `find` record in `range`, fetched concurrently
    pub async fn utxos_in_range(
        &self,
        coin: Coin,
        addr_type: AddrType,
        range: RangeRecord,
        fast: bool,
    ) -> Result<Vec<UtxoEntry>> {
        let descriptor = self
            .api
            .get_index_descriptor(coin, addr_type, SearchType::Find)
            .await?;
        let descriptor = &descriptor;

        let fetches = range.positions().map(move |position| async move {
            let plaintext = self
                .fetch(coin, addr_type, SearchType::Find, descriptor, position, fast)
                .await?;
            self.refill();
            Ok::<_, ClientError>((position, UtxoEntry::from_bytes(&plaintext)?))
        });

        let mut tagged = try_join_all(fetches).await?;
        tagged.sort_by_key(|(position, _)| *position);
        Ok(tagged.into_iter().map(|(_, entry)| entry).collect())
    }

    async fn probe_address(
        &self,
        coin: Coin,
        addr_type: AddrType,
        descriptor: &IndexDescriptor,
        idx: u64,
        key_len: usize,
        fast: bool,
    ) -> Result<Vec<u8>> {
        let plaintext = self
            .fetch(coin, addr_type, SearchType::Address, descriptor, idx, fast)
            .await?;
        metrics::record_probe();
        if plaintext.len() < key_len {
            return Err(ClientError::Protocol(format!(
                "address record has {} bytes, key needs {}",
                plaintext.len(),
                key_len
            )));
        }
        Ok(plaintext)
    }

    /// Build a selector for `idx`, query the view and decrypt the reply
    async fn fetch(
        &self,
        coin: Coin,
        addr_type: AddrType,
        view: SearchType,
        descriptor: &IndexDescriptor,
        idx: u64,
        fast: bool,
    ) -> Result<Vec<u8>> {
        let t_selector = Instant::now();
        let selector = self.build_selector(&descriptor.index_counts, idx, fast)?;
        let t_query = Instant::now();
        let reply = self.api.query(coin, addr_type, view, &selector).await?;
        let t_decrypt = Instant::now();
        let plaintext =
            self.engine
                .decrypt_reply(&self.private_key, descriptor.dimension, descriptor.packing, &reply)?;

        tracing::debug!(
            view = %view,
            position = idx,
            selector_ms = (t_query - t_selector).as_millis() as u64,
            query_ms = (t_decrypt - t_query).as_millis() as u64,
            decrypt_ms = t_decrypt.elapsed().as_millis() as u64,
            "PIR query"
        );
        Ok(plaintext)
    }

    fn build_selector(&self, index_counts: &[u64], idx: u64, fast: bool) -> Result<Selector> {
        let selector = match &self.factory {
            Some(factory) => factory.create(index_counts, idx)?,
            None if fast => self
                .engine
                .create_selector_fast(&self.private_key, index_counts, idx)?,
            None => self
                .engine
                .create_selector(&self.public_key, index_counts, idx)?,
        };
        Ok(selector)
    }

    /// Restock the selector factory in the background
    ///
    /// Not awaited. A failed refill is logged and otherwise dropped.
    fn refill(&self) {
        let Some(factory) = &self.factory else {
            return;
        };
        let fill = factory.fill();
        tokio::spawn(async move {
            if let Err(e) = fill.await {
                tracing::warn!(error = %e, "Selector refill failed");
            }
        });
    }
}

impl std::fmt::Debug for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locator")
            .field("api", &self.api)
            .field("prefetch", &self.factory.is_some())
            .field("fast", &self.fast)
            .finish_non_exhaustive()
    }
}
