//! Request signing for the image-generation service.
//!
//! Every call to the image service carries four query parameters:
//! `AccessKey`, `Signature`, `Timestamp` and `SignatureNonce`. The
//! signature is an HMAC-SHA1 over `uri&timestamp&nonce`, encoded as
//! URL-safe base64 without padding.
//!
//! Gateways depend on the [`RequestSigner`] trait so the scheme can be
//! swapped (or stubbed in tests) without touching the HTTP layer.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::CoreError;

type HmacSha1 = Hmac<Sha1>;

/// Query parameters that authenticate one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedQuery {
    pub access_key: String,
    pub signature: String,
    /// Milliseconds since the Unix epoch, as a decimal string.
    pub timestamp: String,
    pub nonce: String,
}

impl SignedQuery {
    /// Query pairs in the form the image service expects.
    pub fn as_query_pairs(&self) -> [(&'static str, &str); 4] {
        [
            ("AccessKey", self.access_key.as_str()),
            ("Signature", self.signature.as_str()),
            ("Timestamp", self.timestamp.as_str()),
            ("SignatureNonce", self.nonce.as_str()),
        ]
    }
}

/// Capability to authenticate a request to a given URI path.
pub trait RequestSigner: Send + Sync {
    /// Produce fresh authentication parameters for a call to `uri`
    /// (the path component only, e.g. `/api/generate/webui/status`).
    fn sign(&self, uri: &str) -> Result<SignedQuery, CoreError>;
}

/// HMAC-SHA1 signer using an access key / secret key pair.
pub struct HmacSha1Signer {
    access_key: String,
    secret_key: String,
}

impl HmacSha1Signer {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Sign with an explicit timestamp and nonce.
    pub fn sign_with(
        &self,
        uri: &str,
        timestamp: &str,
        nonce: &str,
    ) -> Result<SignedQuery, CoreError> {
        Ok(SignedQuery {
            access_key: self.access_key.clone(),
            signature: compute_signature(&self.secret_key, uri, timestamp, nonce)?,
            timestamp: timestamp.to_string(),
            nonce: nonce.to_string(),
        })
    }
}

impl RequestSigner for HmacSha1Signer {
    fn sign(&self, uri: &str) -> Result<SignedQuery, CoreError> {
        let timestamp = chrono::Utc::now().timestamp_millis().to_string();
        let nonce = uuid::Uuid::new_v4().to_string();
        self.sign_with(uri, &timestamp, &nonce)
    }
}

/// Compute the URL-safe, unpadded base64 HMAC-SHA1 of `uri&timestamp&nonce`.
pub fn compute_signature(
    secret: &str,
    uri: &str,
    timestamp: &str,
    nonce: &str,
) -> Result<String, CoreError> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|e| CoreError::Internal(format!("HMAC key rejected: {e}")))?;
    mac.update(uri.as_bytes());
    mac.update(b"&");
    mac.update(timestamp.as_bytes());
    mac.update(b"&");
    mac.update(nonce.as_bytes());
    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}
