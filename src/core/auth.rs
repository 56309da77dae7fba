//! API credential data structures and verification primitives.
//!
//! The admin API authenticates with HTTP Basic credentials of the form
//! `user_id:secret`. The stored [`ApiKey`] holds `sha1(secret || salt)` in
//! lowercase hex as its `pubkey`; verification recomputes the digest and
//! compares it in constant time.
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use sha1::{Digest, Sha1};

/// API credentials for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub user_id: i64,
    /// `sha1(secret || salt)`, lowercase hex.
    pub pubkey: String,
    pub secret: String,
    pub salt: String,
}

/// Credentials decoded from an `Authorization: Basic` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub user_id: i64,
    pub secret: String,
}

impl BasicCredentials {
    /// Decodes `Basic base64(user_id:secret)`. Returns `None` for any
    /// malformed header; the caller treats that as an authentication failure.
    #[must_use]
    pub fn from_header(header: &str) -> Option<Self> {
        let encoded = header.strip_prefix("Basic ")?;
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;

        let (user_id, secret) = decoded.split_once(':')?;

        Some(Self {
            user_id: user_id.parse().ok()?,
            secret: secret.to_string(),
        })
    }

    /// Whether these credentials match the stored key material.
    #[must_use]
    pub fn verify(&self, key: &ApiKey) -> bool {
        constant_time_eq(digest(&self.secret, &key.salt).as_bytes(), key.pubkey.as_bytes())
    }
}

/// `sha1(secret || salt)` as lowercase hex.
#[must_use]
pub fn digest(secret: &str, salt: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(secret.as_bytes());
    hasher.update(salt.as_bytes());

    hasher.finalize().iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Byte comparison whose running time does not depend on the number of
/// matching leading bytes.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }

    diff == 0
}
