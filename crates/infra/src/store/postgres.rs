//! Postgres-backed inventory store.
//!
//! ## Concurrency
//!
//! Every on-hand write runs in its own transaction:
//!
//! ```text
//! BEGIN
//!   SELECT ... FROM inventory ... FOR UPDATE     (row lock)
//!   reconcile(on_hand, adjustment)               (pure rule, may reject)
//!   UPDATE inventory SET on_hand = ...
//!   INSERT INTO inventory_movements ...
//! COMMIT
//! ```
//!
//! The row lock serializes concurrent adjustments to the same record, so the
//! on-hand used by the rule is the one being overwritten. Opening a new record
//! uses `INSERT ... ON CONFLICT DO NOTHING`; losing that race falls back to the
//! locked read of the row the other transaction created.
//!
//! ## Error Mapping
//!
//! | Postgres code | StoreError |
//! |---------------|------------|
//! | `23505` unique violation | `Conflict` |
//! | `23503` foreign key violation | `NotFound` |
//! | `23514` check violation | `Domain(Validation)` |
//! | anything else | `Database` |

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use async_trait::async_trait;

use stockwise_core::{DomainError, InventoryId, MovementId, ProductId};
use stockwise_inventory::{
    Adjustment, InventoryMovement, InventoryRecord, MovementKind, MovementRequest, Quantity,
    StockAction, StockKey, reconcile,
};
use stockwise_products::{CatalogKey, Product};

use super::r#trait::{InventoryStore, InventorySummary, StockChange, StoreError};

const MIGRATION: &str = include_str!("../../migrations/0001_inventory.sql");

const INVENTORY_COLUMNS: &str =
    "id, product_id, lot_number, location, on_hand, allocated, picked, created_at, updated_at";

const PRODUCT_COLUMNS: &str = "id, product_type, brand, category, name, sku, created_at";

/// Postgres-backed store for the catalog, inventory and ledger.
#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: PgPool,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables, indexes and the ledger append-only trigger (idempotent).
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(MIGRATION)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        tracing::info!("inventory schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn insert_product(&self, product: Product) -> Result<Product, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products (id, product_type, brand, category, name, sku, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product.id.as_uuid())
        .bind(&product.product_type)
        .bind(&product.brand)
        .bind(&product.category)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(product.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;

        ProductRow::from_row(&row)
            .map_err(|e| map_sqlx_error("insert_product", e))
            .map(Product::from)
    }

    #[instrument(skip(self), err)]
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;

        row.map(|r| ProductRow::from_row(&r).map(Product::from))
            .transpose()
            .map_err(|e| map_sqlx_error("get_product", e))
    }

    #[instrument(skip(self), err)]
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter()
            .map(|r| ProductRow::from_row(r).map(Product::from))
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("list_products", e))
    }

    #[instrument(skip(self), fields(key = %key), err)]
    async fn find_product(&self, key: &CatalogKey) -> Result<Option<Product>, StoreError> {
        // Case-sensitive, whitespace-insensitive at the edges (same rule as CatalogKey::matches).
        let row = sqlx::query(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE btrim(product_type) = $1
              AND btrim(brand) = $2
              AND btrim(category) = $3
              AND btrim(name) = $4
            ORDER BY id
            LIMIT 1
            "#
        ))
        .bind(&key.product_type)
        .bind(&key.brand)
        .bind(&key.category)
        .bind(&key.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_product", e))?;

        row.map(|r| ProductRow::from_row(&r).map(Product::from))
            .transpose()
            .map_err(|e| map_sqlx_error("find_product", e))
    }

    #[instrument(skip(self), err)]
    async fn get_inventory(&self, id: InventoryId) -> Result<Option<InventoryRecord>, StoreError> {
        let row = sqlx::query(&format!("SELECT {INVENTORY_COLUMNS} FROM inventory WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_inventory", e))?;

        row.map(|r| inventory_from_row(&r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_inventory(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {INVENTORY_COLUMNS} FROM inventory ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_inventory", e))?;

        rows.iter().map(inventory_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn list_movements(&self, id: InventoryId) -> Result<Vec<InventoryMovement>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, inventory_id, kind, delta, previous_on_hand, new_on_hand, reason, actor, occurred_at
            FROM inventory_movements
            WHERE inventory_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_movements", e))?;

        rows.iter()
            .map(|r| MovementRow::from_row(r).map_err(|e| map_sqlx_error("list_movements", e)))
            .map(|r| r.and_then(MovementRow::into_movement))
            .collect()
    }

    #[instrument(skip(self, movement), fields(actor = %movement.actor), err)]
    async fn adjust(
        &self,
        id: InventoryId,
        adjustment: Adjustment,
        movement: &MovementRequest,
    ) -> Result<StockChange, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let current = lock_by_id(&mut tx, id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("inventory record {id}")))?;

        let change = apply_locked(&mut tx, current, StockAction::Updated, adjustment, movement).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(change)
    }

    #[instrument(
        skip(self, key, movement),
        fields(product_id = %key.product_id, lot = %key.lot_number, location = %key.location),
        err
    )]
    async fn upsert(
        &self,
        key: &StockKey,
        adjustment: Adjustment,
        movement: &MovementRequest,
    ) -> Result<StockChange, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let product_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
                .bind(key.product_id.as_uuid())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("upsert", e))?;
        if !product_exists {
            return Err(StoreError::NotFound(format!("product {}", key.product_id)));
        }

        let (current, action) = match lock_by_key(&mut tx, key).await? {
            Some(existing) => (existing, StockAction::Updated),
            None => {
                // Reject before opening a record that would stay empty.
                reconcile(Quantity::ZERO, adjustment)?;
                match open_record(&mut tx, key, Utc::now()).await? {
                    Some(opened) => (opened, StockAction::Created),
                    // A concurrent transaction opened it first; its row is now visible and locked.
                    None => {
                        let existing = lock_by_key(&mut tx, key).await?.ok_or_else(|| {
                            StoreError::Conflict(format!(
                                "inventory record for {}/{}/{} vanished during upsert",
                                key.product_id, key.lot_number, key.location
                            ))
                        })?;
                        (existing, StockAction::Updated)
                    }
                }
            }
        };

        let change = apply_locked(&mut tx, current, action, adjustment, movement).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(change)
    }

    #[instrument(skip(self), err)]
    async fn summary(&self) -> Result<InventorySummary, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM products)                               AS product_count,
                COUNT(i.id)                                                   AS record_count,
                COALESCE(SUM(i.on_hand), 0)::BIGINT                           AS total_on_hand,
                COALESCE(SUM(i.allocated), 0)::BIGINT                         AS total_allocated,
                COALESCE(SUM(i.picked), 0)::BIGINT                            AS total_picked,
                COALESCE(SUM(i.on_hand - i.allocated - i.picked), 0)::BIGINT  AS total_available,
                COUNT(i.id) FILTER (WHERE i.on_hand - i.allocated - i.picked <= 0) AS depleted_records
            FROM inventory i
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("summary", e))?;

        let count = |name: &str| -> Result<u64, StoreError> {
            row.try_get::<i64, _>(name)
                .map(|v| v.max(0) as u64)
                .map_err(|e| map_sqlx_error("summary", e))
        };
        let total = |name: &str| -> Result<i64, StoreError> {
            row.try_get::<i64, _>(name)
                .map_err(|e| map_sqlx_error("summary", e))
        };

        Ok(InventorySummary {
            product_count: count("product_count")?,
            record_count: count("record_count")?,
            total_on_hand: total("total_on_hand")?,
            total_allocated: total("total_allocated")?,
            total_picked: total("total_picked")?,
            total_available: total("total_available")?,
            depleted_records: count("depleted_records")?,
        })
    }
}

async fn lock_by_id(
    tx: &mut Transaction<'_, Postgres>,
    id: InventoryId,
) -> Result<Option<InventoryRecord>, StoreError> {
    let row = sqlx::query(&format!(
        "SELECT {INVENTORY_COLUMNS} FROM inventory WHERE id = $1 FOR UPDATE"
    ))
    .bind(id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_by_id", e))?;

    row.map(|r| inventory_from_row(&r)).transpose()
}

async fn lock_by_key(
    tx: &mut Transaction<'_, Postgres>,
    key: &StockKey,
) -> Result<Option<InventoryRecord>, StoreError> {
    let row = sqlx::query(&format!(
        r#"
        SELECT {INVENTORY_COLUMNS}
        FROM inventory
        WHERE product_id = $1 AND lot_number = $2 AND location = $3
        FOR UPDATE
        "#
    ))
    .bind(key.product_id.as_uuid())
    .bind(&key.lot_number)
    .bind(&key.location)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_by_key", e))?;

    row.map(|r| inventory_from_row(&r)).transpose()
}

/// Insert an empty record for `key`. `None` if another transaction already did.
async fn open_record(
    tx: &mut Transaction<'_, Postgres>,
    key: &StockKey,
    now: DateTime<Utc>,
) -> Result<Option<InventoryRecord>, StoreError> {
    let record = InventoryRecord::open(key.clone(), Quantity::ZERO, now);
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO inventory (id, product_id, lot_number, location, on_hand, allocated, picked, created_at, updated_at)
        VALUES ($1, $2, $3, $4, 0, 0, 0, $5, $5)
        ON CONFLICT (product_id, lot_number, location) DO NOTHING
        RETURNING {INVENTORY_COLUMNS}
        "#
    ))
    .bind(record.id.as_uuid())
    .bind(key.product_id.as_uuid())
    .bind(&key.lot_number)
    .bind(&key.location)
    .bind(now)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("open_record", e))?;

    row.map(|r| inventory_from_row(&r)).transpose()
}

/// Run the rule against a locked record, write the new on-hand and the ledger entry.
async fn apply_locked(
    tx: &mut Transaction<'_, Postgres>,
    current: InventoryRecord,
    action: StockAction,
    adjustment: Adjustment,
    movement: &MovementRequest,
) -> Result<StockChange, StoreError> {
    let reconciliation = reconcile(current.on_hand, adjustment)?;
    let now = Utc::now();

    let row = sqlx::query(&format!(
        r#"
        UPDATE inventory
        SET on_hand = $2, updated_at = $3
        WHERE id = $1
        RETURNING {INVENTORY_COLUMNS}
        "#
    ))
    .bind(current.id.as_uuid())
    .bind(reconciliation.on_hand.get())
    .bind(now)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("update_on_hand", e))?;
    let record = inventory_from_row(&row)?;

    let entry = movement.record(record.id, action, &reconciliation, now);
    sqlx::query(
        r#"
        INSERT INTO inventory_movements (
            id, inventory_id, kind, delta, previous_on_hand, new_on_hand, reason, actor, occurred_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(entry.id.as_uuid())
    .bind(entry.inventory_id.as_uuid())
    .bind(entry.kind.as_str())
    .bind(entry.delta)
    .bind(entry.previous_on_hand)
    .bind(entry.new_on_hand)
    .bind(&entry.reason)
    .bind(&entry.actor)
    .bind(entry.occurred_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_movement", e))?;

    Ok(StockChange {
        record,
        action,
        reconciliation,
        movement: entry,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::NotFound(msg),
                Some("23514") => StoreError::Domain(DomainError::validation(msg)),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Database(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}

// SQLx row types

#[derive(Debug)]
struct ProductRow {
    id: uuid::Uuid,
    product_type: String,
    brand: String,
    category: String,
    name: String,
    sku: Option<String>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            product_type: row.try_get("product_type")?,
            brand: row.try_get("brand")?,
            category: row.try_get("category")?,
            name: row.try_get("name")?,
            sku: row.try_get("sku")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId::from_uuid(row.id),
            product_type: row.product_type,
            brand: row.brand,
            category: row.category,
            name: row.name,
            sku: row.sku,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug)]
struct InventoryRow {
    id: uuid::Uuid,
    product_id: uuid::Uuid,
    lot_number: String,
    location: String,
    on_hand: i64,
    allocated: i64,
    picked: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for InventoryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(InventoryRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            lot_number: row.try_get("lot_number")?,
            location: row.try_get("location")?,
            on_hand: row.try_get("on_hand")?,
            allocated: row.try_get("allocated")?,
            picked: row.try_get("picked")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<InventoryRow> for InventoryRecord {
    type Error = StoreError;

    fn try_from(row: InventoryRow) -> Result<Self, Self::Error> {
        let qty = |v: i64| {
            Quantity::new(v).map_err(|e| {
                StoreError::Database(format!("corrupt inventory row {}: {}", row.id, e))
            })
        };
        Ok(InventoryRecord {
            id: InventoryId::from_uuid(row.id),
            product_id: ProductId::from_uuid(row.product_id),
            on_hand: qty(row.on_hand)?,
            allocated: qty(row.allocated)?,
            picked: qty(row.picked)?,
            lot_number: row.lot_number,
            location: row.location,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn inventory_from_row(row: &PgRow) -> Result<InventoryRecord, StoreError> {
    InventoryRow::from_row(row)
        .map_err(|e| map_sqlx_error("decode_inventory", e))?
        .try_into()
}

#[derive(Debug)]
struct MovementRow {
    id: uuid::Uuid,
    inventory_id: uuid::Uuid,
    kind: String,
    delta: i64,
    previous_on_hand: i64,
    new_on_hand: i64,
    reason: Option<String>,
    actor: String,
    occurred_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for MovementRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(MovementRow {
            id: row.try_get("id")?,
            inventory_id: row.try_get("inventory_id")?,
            kind: row.try_get("kind")?,
            delta: row.try_get("delta")?,
            previous_on_hand: row.try_get("previous_on_hand")?,
            new_on_hand: row.try_get("new_on_hand")?,
            reason: row.try_get("reason")?,
            actor: row.try_get("actor")?,
            occurred_at: row.try_get("occurred_at")?,
        })
    }
}

impl MovementRow {
    fn into_movement(self) -> Result<InventoryMovement, StoreError> {
        let kind: MovementKind = self
            .kind
            .parse()
            .map_err(|e: DomainError| StoreError::Database(format!("corrupt movement {}: {}", self.id, e)))?;
        Ok(InventoryMovement {
            id: MovementId::from_uuid(self.id),
            inventory_id: InventoryId::from_uuid(self.inventory_id),
            kind,
            delta: self.delta,
            previous_on_hand: self.previous_on_hand,
            new_on_hand: self.new_on_hand,
            reason: self.reason,
            actor: self.actor,
            occurred_at: self.occurred_at,
        })
    }
}
