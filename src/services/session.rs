//! Session tokens
//!
//! The identity core mints its own HS256-signed sessions with the wallet
//! address as subject. The external record store is profile storage only and
//! never sees a password.

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Lowercased wallet address.
    pub sub: String,
    /// Oracle account id in the record store.
    pub oracle: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct SessionSigner {
    key: EncodingKey,
    ttl_seconds: i64,
}

impl SessionSigner {
    pub fn new(secret: &str, ttl_seconds: u64) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            ttl_seconds: ttl_seconds as i64,
        }
    }

    pub fn issue(
        &self,
        wallet: &str,
        oracle_id: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: wallet.to_string(),
            oracle: oracle_id.to_string(),
            iat: now,
            exp: now + self.ttl_seconds,
        };
        encode(&Header::default(), &claims, &self.key)
    }
}
