//! Web Push VAPID key pairs.
//!
//! The public key is the uncompressed SEC1 point (65 bytes, leading `0x04`),
//! the private key the raw 32-byte scalar. Both are base64url without
//! padding, the encoding browsers expect for `applicationServerKey`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use domains::errors::{DomainError, Result};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::SecretKey;
use rand::rngs::OsRng;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VapidKeys {
    pub public_key: String,
    pub private_key: String,
}

impl VapidKeys {
    pub fn generate() -> Self {
        Self::from_secret(&SecretKey::random(&mut OsRng))
    }

    /// Rebuilds the pair from an existing base64url private key.
    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(private_key.trim())
            .map_err(|e| DomainError::validation(format!("VAPID private key is not base64url: {e}")))?;
        let secret = SecretKey::from_slice(&bytes)
            .map_err(|_| DomainError::validation("VAPID private key is not a P-256 scalar"))?;
        Ok(Self::from_secret(&secret))
    }

    fn from_secret(secret: &SecretKey) -> Self {
        let point = secret.public_key().to_encoded_point(false);
        Self {
            public_key: URL_SAFE_NO_PAD.encode(point.as_bytes()),
            private_key: URL_SAFE_NO_PAD.encode(secret.to_bytes()),
        }
    }

    /// `.env` lines for the frontend and the push sender.
    pub fn to_env_lines(&self) -> String {
        format!(
            "VAPID_PUBLIC_KEY={}\nVAPID_PRIVATE_KEY={}\n",
            self.public_key, self.private_key
        )
    }
}
