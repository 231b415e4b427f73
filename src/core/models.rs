// Core data model: items, movements, identities

use crate::core::errors::LedgerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A SKU-identified stock record with its current quantity.
///
/// `quantity` is the only mutable numeric field and must be non-negative
/// after every committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
}

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    Receive,
    Issue,
}

impl MovementKind {
    /// Text form used in the movements.kind column
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Receive => "RECEIVE",
            MovementKind::Issue => "ISSUE",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, LedgerError> {
        match s {
            "RECEIVE" => Ok(MovementKind::Receive),
            "ISSUE" => Ok(MovementKind::Issue),
            other => Err(LedgerError::Storage(format!(
                "unexpected movement kind '{}'",
                other
            ))),
        }
    }
}

/// One immutable ledger entry. Appended exactly once per successful
/// mutation, never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: i64,
    pub item_id: i64,
    pub user_id: Option<i64>,
    pub kind: MovementKind,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

/// A movement joined with its item's sku/name and, when attributable,
/// the acting user's name. `username` is None when the movement was
/// anonymous or the user has since been deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub movement: Movement,
    pub sku: String,
    pub name: String,
    pub username: Option<String>,
}

/// A verified caller, as produced by the identity layer and consumed by
/// the ledger engine for movement attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub username: String,
}

/// Stored user account. The password hash never leaves the auth layer.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

impl UserRecord {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            username: self.username.clone(),
        }
    }
}
