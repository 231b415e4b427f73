// In-memory storage
//
// Dev fallback (no DATABASE_URL) and test double. The whole store is one
// lock domain: `begin` takes the store mutex and holds it until commit or
// rollback, so transactions are fully serialized. That is coarser than the
// Postgres row lock (unrelated items briefly block each other here), but
// every guarantee the engine relies on still holds. Writes go to a staged
// copy that replaces the shared state on commit; dropping a transaction
// without committing leaves the store untouched.

use crate::core::errors::LedgerError;
use crate::core::models::{Item, Movement, MovementKind, MovementRecord, UserRecord};
use crate::store::{LedgerStore, LedgerTx, UserStore};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    items: BTreeMap<i64, Item>,
    sku_index: HashMap<String, i64>,
    movements: Vec<Movement>,
    users: BTreeMap<i64, UserRecord>,
    username_index: HashMap<String, i64>,
    next_item_id: i64,
    next_movement_id: i64,
    next_user_id: i64,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MemoryLedgerTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn select_item_for_update(&mut self, item_id: i64) -> Result<Option<Item>, LedgerError> {
        Ok(self.staged.items.get(&item_id).cloned())
    }

    async fn upsert_item_by_sku(
        &mut self,
        sku: &str,
        name: &str,
        delta: i64,
    ) -> Result<Item, LedgerError> {
        if let Some(id) = self.staged.sku_index.get(sku).copied() {
            let item = self
                .staged
                .items
                .get_mut(&id)
                .ok_or_else(|| LedgerError::Storage(format!("sku index points at missing item {}", id)))?;
            item.name = name.to_string();
            item.quantity += delta;
            return Ok(item.clone());
        }

        self.staged.next_item_id += 1;
        let item = Item {
            id: self.staged.next_item_id,
            sku: sku.to_string(),
            name: name.to_string(),
            quantity: delta,
        };
        self.staged.items.insert(item.id, item.clone());
        self.staged.sku_index.insert(sku.to_string(), item.id);
        Ok(item)
    }

    async fn update_item_quantity(
        &mut self,
        item_id: i64,
        quantity: i64,
    ) -> Result<(), LedgerError> {
        let item = self
            .staged
            .items
            .get_mut(&item_id)
            .ok_or_else(|| LedgerError::Storage(format!("quantity update for missing item {}", item_id)))?;
        item.quantity = quantity;
        Ok(())
    }

    async fn insert_movement(
        &mut self,
        item_id: i64,
        user_id: Option<i64>,
        kind: MovementKind,
        quantity: i64,
    ) -> Result<Movement, LedgerError> {
        self.staged.next_movement_id += 1;
        let movement = Movement {
            id: self.staged.next_movement_id,
            item_id,
            user_id,
            kind,
            quantity,
            created_at: Utc::now(),
        };
        self.staged.movements.push(movement.clone());
        Ok(movement)
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        let mut this = *self;
        *this.guard = this.staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError> {
        // Dropping the guard discards the staged copy.
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryLedgerTx { guard, staged }))
    }

    async fn select_items(&self) -> Result<Vec<Item>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state.items.values().cloned().collect())
    }

    async fn select_movements_joined(
        &self,
        limit: i64,
    ) -> Result<Vec<MovementRecord>, LedgerError> {
        let state = self.state.lock().await;
        state
            .movements
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .map(|m| {
                let item = state.items.get(&m.item_id).ok_or_else(|| {
                    LedgerError::Storage(format!("movement {} references missing item {}", m.id, m.item_id))
                })?;
                let username = m
                    .user_id
                    .and_then(|uid| state.users.get(&uid))
                    .map(|u| u.username.clone());
                Ok(MovementRecord {
                    movement: m.clone(),
                    sku: item.sku.clone(),
                    name: item.name.clone(),
                    username,
                })
            })
            .collect()
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, LedgerError> {
        let mut state = self.state.lock().await;
        if state.username_index.contains_key(username) {
            return Err(LedgerError::Conflict(format!("username '{}' is taken", username)));
        }

        state.next_user_id += 1;
        let user = UserRecord {
            id: state.next_user_id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        };
        state.users.insert(user.id, user.clone());
        state.username_index.insert(username.to_string(), user.id);
        Ok(user)
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state
            .username_index
            .get(username)
            .and_then(|id| state.users.get(id))
            .cloned())
    }
}
