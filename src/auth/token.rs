// Bearer token mint/verify (HS256)
//
// Claims bind the user id (`sub`) and username, with a bounded lifetime.

use crate::core::errors::LedgerError;
use crate::core::models::Identity;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Default credential lifetime: 8 hours
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 8 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    username: String,
    iat: i64,
    exp: i64,
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    /// Mint a signed token for a verified identity.
    pub fn mint(&self, identity: &Identity) -> Result<String, LedgerError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: identity.id.to_string(),
            username: identity.username.clone(),
            iat: now,
            exp: now + self.ttl_secs,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| LedgerError::Internal(format!("token signing failed: {}", e)))
    }

    /// Verify signature and expiry, yielding the caller identity.
    pub fn verify(&self, token: &str) -> Result<Identity, LedgerError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| LedgerError::Unauthenticated(format!("invalid token: {}", e)))?;

        let id = data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| LedgerError::Unauthenticated("invalid token: malformed subject".to_string()))?;

        Ok(Identity {
            id,
            username: data.claims.username,
        })
    }
}
