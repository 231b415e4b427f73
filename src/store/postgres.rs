// Postgres-backed storage
//
// Concurrency contract lives here: `SELECT ... FOR UPDATE` pins the item
// row for the life of the transaction, and the upsert's
// `ON CONFLICT ... DO UPDATE` takes the same row lock, so all mutations of
// one item serialize in lock-acquisition order while other items proceed.

use crate::core::errors::LedgerError;
use crate::core::models::{Item, Movement, MovementKind, MovementRecord, UserRecord};
use crate::store::{LedgerStore, LedgerTx, UserStore};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

/// Database row structure for item queries
#[derive(FromRow)]
struct ItemRow {
    id: i64,
    sku: String,
    name: String,
    quantity: i64,
}

impl From<ItemRow> for Item {
    fn from(r: ItemRow) -> Self {
        Item {
            id: r.id,
            sku: r.sku,
            name: r.name,
            quantity: r.quantity,
        }
    }
}

/// Database row structure for movement inserts
#[derive(FromRow)]
struct MovementRow {
    id: i64,
    item_id: i64,
    user_id: Option<i64>,
    kind: String,
    quantity: i64,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl MovementRow {
    fn into_movement(self) -> Result<Movement, LedgerError> {
        Ok(Movement {
            id: self.id,
            item_id: self.item_id,
            user_id: self.user_id,
            kind: MovementKind::from_str(&self.kind)?,
            quantity: self.quantity,
            created_at: self.created_at,
        })
    }
}

/// Database row structure for the joined movement listing
#[derive(FromRow)]
struct MovementJoinedRow {
    id: i64,
    item_id: i64,
    user_id: Option<i64>,
    kind: String,
    quantity: i64,
    created_at: chrono::DateTime<chrono::Utc>,
    sku: String,
    name: String,
    username: Option<String>,
}

/// Database row structure for user lookup
#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
}

impl From<UserRow> for UserRecord {
    fn from(r: UserRow) -> Self {
        UserRecord {
            id: r.id,
            username: r.username,
            password_hash: r.password_hash,
        }
    }
}

/// Postgres store. Cheap to clone; the pool is the shared handle.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and run pending migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, LedgerError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| LedgerError::Storage(format!("migration failed: {}", e)))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn select_item_for_update(&mut self, item_id: i64) -> Result<Option<Item>, LedgerError> {
        let row = sqlx::query_as::<_, ItemRow>(
            "SELECT id, sku, name, quantity FROM items WHERE id = $1 FOR UPDATE",
        )
        .bind(item_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Item::from))
    }

    async fn upsert_item_by_sku(
        &mut self,
        sku: &str,
        name: &str,
        delta: i64,
    ) -> Result<Item, LedgerError> {
        let row = sqlx::query_as::<_, ItemRow>(
            "INSERT INTO items (sku, name, quantity)
             VALUES ($1, $2, $3)
             ON CONFLICT (sku) DO UPDATE
             SET name = EXCLUDED.name,
                 quantity = items.quantity + EXCLUDED.quantity
             RETURNING id, sku, name, quantity",
        )
        .bind(sku)
        .bind(name)
        .bind(delta)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn update_item_quantity(
        &mut self,
        item_id: i64,
        quantity: i64,
    ) -> Result<(), LedgerError> {
        let result = sqlx::query("UPDATE items SET quantity = $2 WHERE id = $1")
            .bind(item_id)
            .bind(quantity)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() != 1 {
            // The row was locked by this transaction, so it cannot vanish.
            return Err(LedgerError::Storage(format!(
                "quantity update touched {} rows for item {}",
                result.rows_affected(),
                item_id
            )));
        }

        Ok(())
    }

    async fn insert_movement(
        &mut self,
        item_id: i64,
        user_id: Option<i64>,
        kind: MovementKind,
        quantity: i64,
    ) -> Result<Movement, LedgerError> {
        let row = sqlx::query_as::<_, MovementRow>(
            "INSERT INTO movements (item_id, user_id, kind, quantity)
             VALUES ($1, $2, $3, $4)
             RETURNING id, item_id, user_id, kind, quantity, created_at",
        )
        .bind(item_id)
        .bind(user_id)
        .bind(kind.as_str())
        .bind(quantity)
        .fetch_one(&mut *self.tx)
        .await?;

        row.into_movement()
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerTx { tx }))
    }

    async fn select_items(&self) -> Result<Vec<Item>, LedgerError> {
        let rows =
            sqlx::query_as::<_, ItemRow>("SELECT id, sku, name, quantity FROM items ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(Item::from).collect())
    }

    async fn select_movements_joined(
        &self,
        limit: i64,
    ) -> Result<Vec<MovementRecord>, LedgerError> {
        let rows = sqlx::query_as::<_, MovementJoinedRow>(
            "SELECT m.id, m.item_id, m.user_id, m.kind, m.quantity, m.created_at,
                    i.sku, i.name, u.username
             FROM movements m
             JOIN items i ON i.id = m.item_id
             LEFT JOIN users u ON u.id = m.user_id
             ORDER BY m.id DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(MovementRecord {
                    movement: Movement {
                        id: r.id,
                        item_id: r.item_id,
                        user_id: r.user_id,
                        kind: MovementKind::from_str(&r.kind)?,
                        quantity: r.quantity,
                        created_at: r.created_at,
                    },
                    sku: r.sku,
                    name: r.name,
                    username: r.username,
                })
            })
            .collect()
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, LedgerError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (username, password_hash)
             VALUES ($1, $2)
             RETURNING id, username, password_hash",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match unique_violation(&e) {
            true => LedgerError::Conflict(format!("username '{}' is taken", username)),
            false => LedgerError::from(e),
        })?;

        Ok(row.into())
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, LedgerError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRecord::from))
    }
}

/// SQLSTATE 23505: unique_violation
fn unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}
