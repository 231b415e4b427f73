// Ledger engine - the transactional core
//
// Owns no state of its own; every mutation is one storage transaction that
// pairs the quantity change with exactly one movement row, and every
// failure path rolls that transaction back before the error surfaces.

use crate::core::errors::LedgerError;
use crate::core::models::{Identity, Item, MovementKind, MovementRecord};
use crate::store::{LedgerStore, LedgerTx};
use std::sync::Arc;
use tracing::{info, warn};

/// Movement listing page bounds
pub const MOVEMENTS_DEFAULT_LIMIT: i64 = 50;
pub const MOVEMENTS_MAX_LIMIT: i64 = 200;

pub struct LedgerEngine {
    store: Arc<dyn LedgerStore>,
}

impl LedgerEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Record a receipt: create the item on first sight of the SKU, or add
    /// to its quantity and overwrite its name (last write wins). Appends
    /// one RECEIVE movement in the same transaction. An existing SKU is the
    /// merge path, not an error.
    pub async fn receive_stock(
        &self,
        sku: &str,
        name: &str,
        quantity: i64,
        acting_user: Option<&Identity>,
    ) -> Result<Item, LedgerError> {
        let sku = sku.trim();
        let name = name.trim();
        if sku.is_empty() {
            return Err(LedgerError::InvalidInput("sku must not be empty".to_string()));
        }
        if name.is_empty() {
            return Err(LedgerError::InvalidInput("name must not be empty".to_string()));
        }
        require_positive_quantity(quantity)?;

        let mut tx = self.store.begin().await?;
        let outcome: Result<Item, LedgerError> = async {
            let item = tx.upsert_item_by_sku(sku, name, quantity).await?;
            tx.insert_movement(
                item.id,
                acting_user.map(|u| u.id),
                MovementKind::Receive,
                quantity,
            )
            .await?;
            Ok(item)
        }
        .await;

        match outcome {
            Ok(item) => {
                tx.commit().await?;
                info!(
                    sku = %item.sku,
                    item_id = item.id,
                    quantity = quantity,
                    new_total = item.quantity,
                    "Stock received"
                );
                Ok(item)
            }
            Err(err) => {
                roll_back(tx, &err).await;
                Err(err)
            }
        }
    }

    /// Issue stock against an existing item. The item row is read under an
    /// exclusive lock held for the whole transaction, so concurrent issues
    /// of one item serialize and can never drive the quantity negative.
    pub async fn issue_stock(
        &self,
        item_id: i64,
        quantity: i64,
        acting_user: Option<&Identity>,
    ) -> Result<Item, LedgerError> {
        require_positive_quantity(quantity)?;

        let mut tx = self.store.begin().await?;
        let outcome: Result<Item, LedgerError> = async {
            let mut item = tx
                .select_item_for_update(item_id)
                .await?
                .ok_or_else(|| LedgerError::NotFound(format!("item {} does not exist", item_id)))?;

            if quantity > item.quantity {
                return Err(LedgerError::InsufficientStock {
                    requested: quantity,
                    available: item.quantity,
                });
            }

            item.quantity -= quantity;
            tx.update_item_quantity(item.id, item.quantity).await?;
            tx.insert_movement(
                item.id,
                acting_user.map(|u| u.id),
                MovementKind::Issue,
                quantity,
            )
            .await?;
            Ok(item)
        }
        .await;

        match outcome {
            Ok(item) => {
                tx.commit().await?;
                info!(
                    sku = %item.sku,
                    item_id = item.id,
                    quantity = quantity,
                    remaining = item.quantity,
                    user_id = ?acting_user.map(|u| u.id),
                    "Stock issued"
                );
                Ok(item)
            }
            Err(err) => {
                roll_back(tx, &err).await;
                Err(err)
            }
        }
    }

    /// All items, ascending id.
    pub async fn list_items(&self) -> Result<Vec<Item>, LedgerError> {
        self.store.select_items().await
    }

    /// Most recent movements first, joined with item and user names.
    /// `limit` defaults to 50 and is clamped to [1, 200].
    pub async fn list_movements(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<MovementRecord>, LedgerError> {
        let limit = limit
            .unwrap_or(MOVEMENTS_DEFAULT_LIMIT)
            .clamp(1, MOVEMENTS_MAX_LIMIT);
        self.store.select_movements_joined(limit).await
    }
}

fn require_positive_quantity(quantity: i64) -> Result<(), LedgerError> {
    if quantity <= 0 {
        return Err(LedgerError::InvalidInput(format!(
            "quantity must be a positive integer, got {}",
            quantity
        )));
    }
    Ok(())
}

async fn roll_back(tx: Box<dyn LedgerTx>, cause: &LedgerError) {
    if let Err(rb_err) = tx.rollback().await {
        warn!(error = %rb_err, cause = %cause, "Rollback failed after aborted mutation");
    }
}
