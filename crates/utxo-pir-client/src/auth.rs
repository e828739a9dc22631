//! Request signing for authenticated endpoints
//!
//! `X-Signature = base64(HMAC-SHA3-256(api_key, "{nonce}:{body}"))`

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha3::Sha3_256;

type HmacSha3 = Hmac<Sha3_256>;

/// Holds the shared API secret and signs request bodies with it
#[derive(Clone)]
pub struct AuthSigner {
    secret: Vec<u8>,
}

impl AuthSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Tag for one request; `body` is the exact JSON text that is sent
    pub fn sign(&self, nonce: u64, body: &str) -> String {
        let mut mac = HmacSha3::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(nonce.to_string().as_bytes());
        mac.update(b":");
        mac.update(body.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }
}

impl fmt::Debug for AuthSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthSigner(<redacted>)")
    }
}
