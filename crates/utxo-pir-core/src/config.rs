//! Client configuration

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.crypto-incognito.com/";

/// Key under which the distributed nonce is stored
pub const DEFAULT_NONCE_KEY: &str = "com.crypto-incognito.nonce";

/// Where authenticated-request nonces come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NonceBackend {
    /// In-process counter; monotonic within one process only
    Local,
    /// Leased lock plus shared nonce value in Redis
    Redis {
        url: String,
        #[serde(default = "default_nonce_key")]
        key: String,
        /// Must exceed the longest authenticated round trip
        #[serde(default = "default_lease_ttl_ms")]
        lease_ttl_ms: u64,
        #[serde(default = "default_retry_delay_ms")]
        retry_delay_ms: u64,
        #[serde(default = "default_max_attempts")]
        max_attempts: u32,
    },
}

impl NonceBackend {
    /// Redis backend with default key and lease settings
    pub fn redis(url: impl Into<String>) -> Self {
        NonceBackend::Redis {
            url: url.into(),
            key: default_nonce_key(),
            lease_ttl_ms: default_lease_ttl_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for NonceBackend {
    fn default() -> Self {
        NonceBackend::Local
    }
}

fn default_nonce_key() -> String {
    DEFAULT_NONCE_KEY.to_string()
}

fn default_lease_ttl_ms() -> u64 {
    30_000
}

fn default_retry_delay_ms() -> u64 {
    100
}

fn default_max_attempts() -> u32 {
    600
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

/// Configuration for the API client and locator
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the API; paths are appended after a single `/`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Credential identity sent as `X-API-ID`
    pub api_id: String,
    /// Shared HMAC secret
    pub api_key: String,
    /// Derive selectors from the private key instead of the public key
    #[serde(default)]
    pub fast_selectors: bool,
    #[serde(default)]
    pub nonce: NonceBackend,
}

impl ClientConfig {
    pub fn new(api_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: default_endpoint(),
            api_id: api_id.into(),
            api_key: api_key.into(),
            fast_selectors: false,
            nonce: NonceBackend::Local,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_nonce_backend(mut self, nonce: NonceBackend) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn with_fast_selectors(mut self, enabled: bool) -> Self {
        self.fast_selectors = enabled;
        self
    }

    /// Build from `CI_API_ID`, `CI_API_KEY`, `CI_API_END_POINT` and `REDIS_HOST`
    ///
    /// Returns `None` when no credentials are set.
    pub fn from_env() -> Option<Self> {
        let api_id = std::env::var("CI_API_ID").ok()?;
        let api_key = std::env::var("CI_API_KEY").ok()?;

        let mut config = Self::new(api_id, api_key);
        if let Ok(endpoint) = std::env::var("CI_API_END_POINT") {
            config.endpoint = endpoint;
        }
        if let Ok(host) = std::env::var("REDIS_HOST") {
            let url = if host.contains("://") {
                host
            } else {
                format!("redis://{host}")
            };
            config.nonce = NonceBackend::redis(url);
        }
        Some(config)
    }

    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("api_id", &self.api_id)
            .field("api_key", &"<redacted>")
            .field("fast_selectors", &self.fast_selectors)
            .field("nonce", &self.nonce)
            .finish()
    }
}
