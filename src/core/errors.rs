// Domain error types - one taxonomy for every failure the service can surface

use thiserror::Error;

/// Main error type for the ledger service
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Caller supplied an empty sku/name or a non-positive quantity (HTTP 400)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Issue against a non-existent item (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Issue quantity exceeds current stock (HTTP 409)
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    /// Uniqueness violation on registration (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing, malformed, or expired credential (HTTP 401)
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Transaction or connection failure; the mutation was rolled back (HTTP 500)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Non-storage internal failure, e.g. a hashing or signing error (HTTP 500)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            LedgerError::InvalidInput(_) => 400,
            LedgerError::NotFound(_) => 404,
            LedgerError::InsufficientStock { .. } => 409,
            LedgerError::Conflict(_) => 409,
            LedgerError::Unauthenticated(_) => 401,
            LedgerError::Storage(_) => 500,
            LedgerError::Internal(_) => 500,
        }
    }

    /// Get user-friendly error message (no storage internals)
    pub fn user_message(&self) -> String {
        match self {
            LedgerError::Storage(_) | LedgerError::Internal(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}
