// Storage abstraction layer
//
// The engine owns no state; everything lives behind these traits so the
// binary can run against Postgres while tests and DATABASE_URL-less dev
// runs use the in-memory implementation.

use crate::core::errors::LedgerError;
use crate::core::models::{Item, Movement, MovementKind, MovementRecord, UserRecord};
use async_trait::async_trait;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// One open storage transaction.
///
/// Every mutation the engine performs happens inside exactly one of these.
/// Dropping a transaction without calling `commit` must leave the store
/// unchanged; both implementations uphold that, so an abandoned request
/// can never persist a partial mutation.
#[async_trait]
pub trait LedgerTx: Send {
    /// Read an item row under an exclusive lock held until commit/rollback.
    async fn select_item_for_update(&mut self, item_id: i64) -> Result<Option<Item>, LedgerError>;

    /// Create the item for `sku`, or add `delta` to its quantity and
    /// overwrite its name. Takes the same row lock as
    /// `select_item_for_update`.
    async fn upsert_item_by_sku(
        &mut self,
        sku: &str,
        name: &str,
        delta: i64,
    ) -> Result<Item, LedgerError>;

    /// Write an already-locked item's new quantity (issue path).
    async fn update_item_quantity(
        &mut self,
        item_id: i64,
        quantity: i64,
    ) -> Result<(), LedgerError>;

    /// Append one ledger entry for the item locked by this transaction.
    async fn insert_movement(
        &mut self,
        item_id: i64,
        user_id: Option<i64>,
        kind: MovementKind,
        quantity: i64,
    ) -> Result<Movement, LedgerError>;

    async fn commit(self: Box<Self>) -> Result<(), LedgerError>;

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError>;
}

/// Ledger storage: transactions plus the non-locking read paths.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError>;

    /// All items, ascending id. Committed read, no locks.
    async fn select_items(&self) -> Result<Vec<Item>, LedgerError>;

    /// Most recent `limit` movements (descending id), each joined with its
    /// item's sku/name and the acting user's name where one still exists.
    async fn select_movements_joined(&self, limit: i64)
        -> Result<Vec<MovementRecord>, LedgerError>;

    /// Connectivity probe for the health endpoint.
    async fn ping(&self) -> Result<(), LedgerError>;
}

/// User account storage for the identity layer.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new account. A username collision is a `Conflict`, not a
    /// storage fault.
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, LedgerError>;

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, LedgerError>;
}
