// Configuration management

use crate::auth::token::DEFAULT_TOKEN_TTL_SECS;
use crate::core::errors::LedgerError;
use serde::{Deserialize, Serialize};
use std::env;

/// Application configuration loaded from environment variables
///
/// Runs against Postgres when `DATABASE_URL` is set; otherwise the binary
/// falls back to the in-memory store (dev mode). All fields are validated
/// on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub bind_address: String,
    pub port: u16,

    // Database configuration (optional; in-memory fallback when unset)
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    // Credential configuration
    pub jwt_secret: String,
    pub token_ttl_secs: i64,

    // Middleware configuration
    pub request_timeout_secs: u64,
    pub body_size_limit_bytes: usize,

    // Logging configuration
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Supports `.env` file loading in development (via dotenv crate).
    pub fn from_env() -> Result<Self, LedgerError> {
        // Load .env file if present (development). Skipped under test so it
        // cannot interfere with test environment variables.
        #[cfg(not(test))]
        {
            dotenv::dotenv().ok();
        }

        let config = Self {
            bind_address: Self::get_env_or_default("BIND_ADDRESS", "0.0.0.0"),
            port: Self::parse_u16_or_default("PORT", 3000)?,
            database_url: Self::get_optional_env("DATABASE_URL"),
            database_max_connections: Self::parse_u32_or_default("DATABASE_MAX_CONNECTIONS", 10)?,
            jwt_secret: Self::get_env_or_default("JWT_SECRET", "dev-secret-change-me"),
            token_ttl_secs: Self::parse_i64_or_default("TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?,
            request_timeout_secs: Self::parse_u64_or_default("REQUEST_TIMEOUT_SECS", 30)?,
            body_size_limit_bytes: Self::parse_usize_or_default("BODY_SIZE_LIMIT_BYTES", 1024 * 1024)?,
            log_level: Self::get_env_or_default("LOG_LEVEL", "info"),
            log_format: Self::get_env_or_default("LOG_FORMAT", "text"),
        };

        config.validate()?;

        Ok(config)
    }

    /// Post-load validation with clear error messages
    fn validate(&self) -> Result<(), LedgerError> {
        if self.jwt_secret.is_empty() {
            return Err(LedgerError::Internal("JWT_SECRET must not be empty".to_string()));
        }
        if self.token_ttl_secs <= 0 {
            return Err(LedgerError::Internal("TOKEN_TTL_SECS must be positive".to_string()));
        }
        if self.log_format != "json" && self.log_format != "text" {
            return Err(LedgerError::Internal(format!(
                "LOG_FORMAT must be 'json' or 'text', got '{}'",
                self.log_format
            )));
        }
        Ok(())
    }

    fn get_env_or_default(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    fn get_optional_env(key: &str) -> Option<String> {
        match env::var(key) {
            Ok(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }

    fn parse_u16_or_default(key: &str, default: u16) -> Result<u16, LedgerError> {
        match env::var(key) {
            Ok(value) => value
                .parse()
                .map_err(|_| LedgerError::Internal(format!("{} must be a valid u16, got '{}'", key, value))),
            Err(_) => Ok(default),
        }
    }

    fn parse_u32_or_default(key: &str, default: u32) -> Result<u32, LedgerError> {
        match env::var(key) {
            Ok(value) => value
                .parse()
                .map_err(|_| LedgerError::Internal(format!("{} must be a valid u32, got '{}'", key, value))),
            Err(_) => Ok(default),
        }
    }

    fn parse_u64_or_default(key: &str, default: u64) -> Result<u64, LedgerError> {
        match env::var(key) {
            Ok(value) => value
                .parse()
                .map_err(|_| LedgerError::Internal(format!("{} must be a valid u64, got '{}'", key, value))),
            Err(_) => Ok(default),
        }
    }

    fn parse_i64_or_default(key: &str, default: i64) -> Result<i64, LedgerError> {
        match env::var(key) {
            Ok(value) => value
                .parse()
                .map_err(|_| LedgerError::Internal(format!("{} must be a valid i64, got '{}'", key, value))),
            Err(_) => Ok(default),
        }
    }

    fn parse_usize_or_default(key: &str, default: usize) -> Result<usize, LedgerError> {
        match env::var(key) {
            Ok(value) => value
                .parse()
                .map_err(|_| LedgerError::Internal(format!("{} must be a valid usize, got '{}'", key, value))),
            Err(_) => Ok(default),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            database_max_connections: 10,
            jwt_secret: "dev-secret-change-me".to_string(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            request_timeout_secs: 30,
            body_size_limit_bytes: 1024 * 1024,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}
