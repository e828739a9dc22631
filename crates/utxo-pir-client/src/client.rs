//! HTTP client for the remote index API

use std::time::{Duration, Instant};

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;

use utxo_pir_core::{
    AddrType, ApiResponse, ClientConfig, Coin, CoinsResponse, IndexDescriptor, QueryRequest,
    QueryResponse, SearchType, DEFAULT_ENDPOINT, HEADER_API_ID, HEADER_NONCE, HEADER_SIGNATURE,
    PRIVATE_PREFIX, PUBLIC_PREFIX,
};

use crate::auth::AuthSigner;
use crate::error::{ClientError, Result};
use crate::metrics;
use crate::nonce::NonceCoordinator;
use crate::pir::{Reply, Selector};

/// Message for a body-carrying method called without a body
pub const MISSING_BODY: &str = "body is required to call this API.";

fn requires_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::DELETE
}

/// Client for the public (`pub/`) and authenticated (`priv/`) endpoints
///
/// Every authenticated call runs one full nonce cycle; the lock is held
/// across the HTTP round trip and released on every exit path.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    endpoint: String,
    api_id: String,
    signer: AuthSigner,
    nonce: NonceCoordinator,
}

impl ApiClient {
    pub fn builder(api_id: impl Into<String>, api_key: impl AsRef<[u8]>) -> ApiClientBuilder {
        ApiClientBuilder::new(api_id, api_key)
    }

    /// Client limited to public endpoints
    pub fn public(endpoint: impl Into<String>) -> Result<Self> {
        ApiClientBuilder::new("", "").endpoint(endpoint).build()
    }

    /// Build from configuration, connecting the selected nonce backend
    pub async fn from_config(config: &ClientConfig) -> Result<Self> {
        let nonce = NonceCoordinator::from_backend(&config.nonce).await?;
        Self::builder(&config.api_id, &config.api_key)
            .endpoint(&config.endpoint)
            .nonce(nonce)
            .build()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn nonce_coordinator(&self) -> &NonceCoordinator {
        &self.nonce
    }

    /// One raw round trip, unwrapping the `{error?, data}` envelope
    ///
    /// `path` is relative to the endpoint. `POST`, `PUT` and `DELETE` fail
    /// without touching the network when `body` is `None`.
    pub async fn call_api<T: DeserializeOwned>(
        &self,
        path: &str,
        method: Method,
        headers: &[(&str, String)],
        body: Option<String>,
    ) -> Result<T> {
        if requires_body(&method) && body.is_none() {
            return Err(ClientError::Protocol(MISSING_BODY.to_string()));
        }

        let url = format!("{}{}", self.endpoint, path);
        let mut request = self.http.request(method, &url);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let resp = request.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiResponse<serde_json::Value>>(&text)
                .ok()
                .and_then(|envelope| envelope.error)
                .unwrap_or_else(|| {
                    if text.is_empty() {
                        status.to_string()
                    } else {
                        text.clone()
                    }
                });
            tracing::debug!(path, status = status.as_u16(), "API call failed");
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&text)
            .map_err(|e| ClientError::Protocol(format!("malformed response envelope: {e}")))?;
        if let Some(message) = envelope.error {
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }
        envelope
            .data
            .ok_or_else(|| ClientError::Protocol("response envelope has no data".to_string()))
    }

    /// Unauthenticated `GET pub/{path}`
    pub async fn call_public<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.call_api(&format!("{PUBLIC_PREFIX}{path}"), Method::GET, &[], None)
            .await
    }

    /// Authenticated call to `priv/{path}`
    pub async fn call_private<T, B>(&self, path: &str, method: Method, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = body.map(serde_json::to_string).transpose()?;
        if requires_body(&method) && body.is_none() {
            return Err(ClientError::Protocol(MISSING_BODY.to_string()));
        }

        let token = self.nonce.acquire().await?;
        let nonce = self.nonce.get_nonce(&token);
        let signature = self.signer.sign(nonce, body.as_deref().unwrap_or(""));
        let headers = [
            (HEADER_NONCE, nonce.to_string()),
            (HEADER_API_ID, self.api_id.clone()),
            (HEADER_SIGNATURE, signature),
        ];

        let result = self
            .call_api(&format!("{PRIVATE_PREFIX}{path}"), method, &headers, body)
            .await;
        let released = self.nonce.release(token).await;

        match (result, released) {
            (Ok(data), Ok(())) => Ok(data),
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(release_err)) => {
                tracing::warn!(error = %release_err, "failed to release nonce lock");
                Err(e)
            }
        }
    }

    /// `GET pub/coins`
    pub async fn get_coins(&self) -> Result<Vec<String>> {
        let resp: CoinsResponse = self.call_public("coins").await?;
        Ok(resp.coins)
    }

    /// `GET pub/utxoSetInfo/{coin}/{addrType}/{searchType}`
    pub async fn get_index_descriptor(
        &self,
        coin: Coin,
        addr_type: AddrType,
        search_type: SearchType,
    ) -> Result<IndexDescriptor> {
        self.call_public(&format!("utxoSetInfo/{coin}/{addr_type}/{search_type}"))
            .await
    }

    /// `PUT priv/utxo/{coin}/{addrType}/{searchType}` with one selector
    pub async fn query(
        &self,
        coin: Coin,
        addr_type: AddrType,
        search_type: SearchType,
        selector: &Selector,
    ) -> Result<Reply> {
        let start = Instant::now();
        let request = QueryRequest {
            selector: selector.to_base64(),
        };
        let result: Result<QueryResponse> = self
            .call_private(
                &format!("utxo/{coin}/{addr_type}/{search_type}"),
                Method::PUT,
                Some(&request),
            )
            .await;

        let outcome = match &result {
            Ok(_) => metrics::OUTCOME_OK,
            Err(ClientError::Server { status, .. }) if *status < 500 => metrics::OUTCOME_CLIENT_ERROR,
            Err(_) => metrics::OUTCOME_SERVER_ERROR,
        };
        metrics::record_query(search_type, outcome, start.elapsed());

        let resp = result?;
        Reply::from_base64(&resp.reply)
            .map_err(|e| ClientError::Protocol(format!("reply is not valid base64: {e}")))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("endpoint", &self.endpoint)
            .field("api_id", &self.api_id)
            .field("nonce", &self.nonce)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ApiClient`]
pub struct ApiClientBuilder {
    endpoint: String,
    api_id: String,
    signer: AuthSigner,
    nonce: Option<NonceCoordinator>,
    timeout: Option<Duration>,
}

impl ApiClientBuilder {
    pub fn new(api_id: impl Into<String>, api_key: impl AsRef<[u8]>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_id: api_id.into(),
            signer: AuthSigner::new(api_key),
            nonce: None,
            timeout: None,
        }
    }

    /// Base URL; a trailing slash is added if missing
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn nonce(mut self, nonce: NonceCoordinator) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Per-request timeout enforced by the HTTP transport
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fails when the HTTP transport cannot be initialized
    pub fn build(self) -> Result<ApiClient> {
        let mut endpoint = self.endpoint;
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }

        let mut http = Client::builder();
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }

        Ok(ApiClient {
            http: http.build()?,
            endpoint,
            api_id: self.api_id,
            signer: self.signer,
            nonce: self.nonce.unwrap_or_default(),
        })
    }
}
