//! Mock index API for integration tests
//!
//! Serves the `pub/` and `priv/` endpoints over a transparent PIR engine,
//! checks request signatures and nonce order, and counts every request.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tokio::net::TcpListener;

use utxo_pir_client::testing::TransparentEngine;
use utxo_pir_client::{ApiClient, AuthSigner, NonceCoordinator};
use utxo_pir_core::{
    AddrType, ApiResponse, Coin, CoinsResponse, IndexDescriptor, QueryRequest, QueryResponse,
    RangeRecord, SearchType, UtxoEntry,
};

pub const API_ID: &str = "test-api-id";
pub const API_KEY: &str = "test-api-key";
pub const NOT_FOUND: &str = "Requested endpoint not found.";

/// Address-view records are padded past the key, like the real index
const ADDRESS_RECORD_SIZE: usize = 32;

struct View {
    descriptor: IndexDescriptor,
    records: Vec<Vec<u8>>,
}

impl View {
    fn new(records: Vec<Vec<u8>>) -> Self {
        let count = records.len() as u64;
        Self {
            descriptor: IndexDescriptor {
                height: 800_000,
                element_count: count,
                index_counts: vec![count.max(1)],
                dimension: 1,
                packing: 1,
            },
            records,
        }
    }
}

fn view_key(coin: &str, addr_type: &str, search_type: &str) -> String {
    format!("{coin}/{addr_type}/{search_type}")
}

/// Sorted address index with the UTXOs of every key
#[derive(Default)]
pub struct AddressIndex {
    entries: Vec<(Vec<u8>, Vec<UtxoEntry>)>,
}

impl AddressIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, key: &[u8], utxos: Vec<UtxoEntry>) -> Self {
        self.entries.push((key.to_vec(), utxos));
        self
    }
}

pub struct MockState {
    requests: AtomicUsize,
    queries: AtomicUsize,
    coins: Vec<String>,
    views: HashMap<String, View>,
    nonces: Mutex<Vec<u64>>,
    signer: AuthSigner,
}

impl MockState {
    pub fn new() -> Self {
        Self {
            requests: AtomicUsize::new(0),
            queries: AtomicUsize::new(0),
            coins: vec!["btc".to_string(), "tbtc".to_string()],
            views: HashMap::new(),
            nonces: Mutex::new(Vec::new()),
            signer: AuthSigner::new(API_KEY),
        }
    }

    /// Register the address, range and find views for one `(coin, addrType)`
    pub fn with_index(mut self, coin: Coin, addr_type: AddrType, index: AddressIndex) -> Self {
        let mut entries = index.entries;
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut address = Vec::new();
        let mut range = Vec::new();
        let mut find = Vec::new();
        for (key, utxos) in entries {
            let mut record = key;
            record.resize(record.len().max(ADDRESS_RECORD_SIZE), 0);
            address.push(record);
            range.push(RangeRecord::new(find.len() as u32, utxos.len() as u32).to_bytes().to_vec());
            find.extend(utxos.iter().map(|u| u.to_bytes().to_vec()));
        }

        for (search_type, records) in [
            (SearchType::Address, address),
            (SearchType::Range, range),
            (SearchType::Find, find),
        ] {
            self.views.insert(
                view_key(coin.as_str(), addr_type.as_str(), search_type.as_str()),
                View::new(records),
            );
        }
        self
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ApiResponse::<()>::err(message))).into_response()
}

async fn count_requests(State(state): State<Arc<MockState>>, request: Request, next: Next) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    next.run(request).await
}

async fn coins(State(state): State<Arc<MockState>>) -> Response {
    Json(ApiResponse::ok(CoinsResponse {
        coins: state.coins.clone(),
    }))
    .into_response()
}

async fn utxo_set_info(
    State(state): State<Arc<MockState>>,
    Path((coin, addr_type, search_type)): Path<(String, String, String)>,
) -> Response {
    match state.views.get(&view_key(&coin, &addr_type, &search_type)) {
        Some(view) => Json(ApiResponse::ok(view.descriptor.clone())).into_response(),
        None => error_response(StatusCode::NOT_FOUND, NOT_FOUND),
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn query(
    State(state): State<Arc<MockState>>,
    Path((coin, addr_type, search_type)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let (Some(nonce), Some(api_id), Some(signature)) = (
        header(&headers, "x-nonce").and_then(|n| n.parse::<u64>().ok()),
        header(&headers, "x-api-id"),
        header(&headers, "x-signature"),
    ) else {
        return error_response(StatusCode::UNAUTHORIZED, "Missing authentication headers.");
    };
    if api_id != API_ID || signature != state.signer.sign(nonce, &body) {
        return error_response(StatusCode::UNAUTHORIZED, "Invalid signature.");
    }
    {
        let mut nonces = state.nonces.lock().unwrap();
        if nonces.last().is_some_and(|&last| nonce <= last) {
            return error_response(StatusCode::UNAUTHORIZED, "Invalid nonce.");
        }
        nonces.push(nonce);
    }

    let Some(view) = state.views.get(&view_key(&coin, &addr_type, &search_type)) else {
        return error_response(StatusCode::NOT_FOUND, NOT_FOUND);
    };
    let Ok(request) = serde_json::from_str::<QueryRequest>(&body) else {
        return error_response(StatusCode::BAD_REQUEST, "Malformed body.");
    };
    let Some(record) = BASE64
        .decode(&request.selector)
        .ok()
        .and_then(|bytes| TransparentEngine::selected_index(&bytes))
        .and_then(|idx| view.records.get(idx as usize))
    else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid selector.");
    };

    state.queries.fetch_add(1, Ordering::SeqCst);
    let reply = TransparentEngine::reply(record);
    Json(ApiResponse::ok(QueryResponse {
        reply: BASE64.encode(&reply.0),
    }))
    .into_response()
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, NOT_FOUND)
}

/// Running mock server, shut down on drop
pub struct MockApi {
    pub url: String,
    pub state: Arc<MockState>,
    _shutdown: tokio::sync::oneshot::Sender<()>,
}

impl MockApi {
    pub async fn start(state: MockState) -> Self {
        let state = Arc::new(state);
        let router = Router::new()
            .route("/pub/coins", get(coins))
            .route("/pub/utxoSetInfo/:coin/:addr_type/:search_type", get(utxo_set_info))
            .route("/priv/utxo/:coin/:addr_type/:search_type", put(query))
            .fallback(not_found)
            .layer(middleware::from_fn_with_state(state.clone(), count_requests))
            .with_state(state.clone());

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("bind should succeed");
        let addr = listener.local_addr().expect("listener has an address");
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Self {
            url: format!("http://{}/", addr),
            state,
            _shutdown: shutdown_tx,
        }
    }

    /// Every HTTP request the server received
    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// Successful `priv/utxo` queries
    pub fn queries(&self) -> usize {
        self.state.queries.load(Ordering::SeqCst)
    }

    /// Nonces accepted, in arrival order
    pub fn nonces(&self) -> Vec<u64> {
        self.state.nonces.lock().unwrap().clone()
    }

    pub fn client(&self) -> ApiClient {
        self.client_with_nonce(NonceCoordinator::local())
    }

    pub fn client_with_nonce(&self, nonce: NonceCoordinator) -> ApiClient {
        ApiClient::builder(API_ID, API_KEY)
            .endpoint(&self.url)
            .nonce(nonce)
            .build()
            .unwrap()
    }
}

pub fn utxo(txid_byte: u8, vout: u32, value: u64) -> UtxoEntry {
    UtxoEntry::new([txid_byte; 32], vout, value)
}
