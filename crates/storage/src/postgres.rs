//! Postgres-backed store implementation.
//!
//! All state lives in six tables (see `schema.sql`). The two contention
//! points are handled at the database level:
//!
//! - the decrement guard is a single conditional `UPDATE ... WHERE
//!   quantity >= $qty RETURNING quantity`; losers of a concurrent race
//!   affect zero rows and surface as `None`,
//! - placeholder creation is `INSERT ... ON CONFLICT (order_sku) DO
//!   NOTHING`, so concurrent first-sight of an order SKU parks one row.
//!
//! ## Error Mapping
//!
//! | sqlx error                           | StorageError   | scenario                      |
//! |--------------------------------------|----------------|-------------------------------|
//! | PoolTimedOut / PoolClosed / Io / Tls | `Connection`   | pool exhausted, network down  |
//! | ColumnDecode / Decode / TypeNotFound | `MalformedRow` | schema drift                  |
//! | anything else                        | `Query`        | constraint/syntax/other       |

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use stockwise_catalog::{
    ComponentRequirement, InsumoRequirement, SkuMapping, StockItem, StockLocation,
};
use stockwise_core::{LocationId, MappingId, SkuCode};

use crate::error::StorageError;
use crate::store::EngineStore;

/// Connection pool sizing.
///
/// The pool bound also caps how much of the engine's batch fan-out
/// actually reaches the database at once.
#[derive(Debug, Clone)]
pub struct PgPoolConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PgPoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Postgres-backed [`EngineStore`].
///
/// Thread-safe: all operations go through the sqlx connection pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect with pool limits from `config`.
    pub async fn connect(url: &str, config: PgPoolConfig) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Self::new(pool))
    }
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StorageError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
            StorageError::Connection(format!("{operation}: {err}"))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::TypeNotFound { .. } => {
            StorageError::malformed(operation, err.to_string())
        }
        other => StorageError::query(operation, other.to_string()),
    }
}

fn codes(skus: &[SkuCode]) -> Vec<String> {
    skus.iter().map(|s| s.as_str().to_string()).collect()
}

#[derive(FromRow)]
struct MappingRow {
    id: uuid::Uuid,
    order_sku: String,
    stock_sku: Option<String>,
    kit_sku: Option<String>,
    unit_multiplier: i64,
    active: bool,
    auto_detected: bool,
    created_at: DateTime<Utc>,
}

impl From<MappingRow> for SkuMapping {
    fn from(row: MappingRow) -> Self {
        Self {
            id: MappingId::from_uuid(row.id),
            order_sku: SkuCode::new(row.order_sku),
            stock_sku: row.stock_sku.map(SkuCode::new),
            kit_sku: row.kit_sku.map(SkuCode::new),
            unit_multiplier: row.unit_multiplier,
            active: row.active,
            auto_detected: row.auto_detected,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct StockItemRow {
    sku: String,
    active: bool,
    quantity_on_hand: i64,
    minimum_quantity: i64,
}

impl From<StockItemRow> for StockItem {
    fn from(row: StockItemRow) -> Self {
        Self {
            sku: SkuCode::new(row.sku),
            active: row.active,
            quantity_on_hand: row.quantity_on_hand,
            minimum_quantity: row.minimum_quantity,
        }
    }
}

#[derive(FromRow)]
struct ComponentRow {
    parent_sku: String,
    component_sku: String,
    quantity_per_unit: i64,
    location_id: Option<String>,
}

impl From<ComponentRow> for ComponentRequirement {
    fn from(row: ComponentRow) -> Self {
        Self {
            parent_sku: SkuCode::new(row.parent_sku),
            component_sku: SkuCode::new(row.component_sku),
            quantity_per_unit: row.quantity_per_unit,
            location_id: row.location_id.map(LocationId::new),
        }
    }
}

#[derive(FromRow)]
struct InsumoRow {
    product_sku: String,
    insumo_sku: String,
    quantity: i64,
    active: bool,
}

impl From<InsumoRow> for InsumoRequirement {
    fn from(row: InsumoRow) -> Self {
        Self {
            product_sku: SkuCode::new(row.product_sku),
            insumo_sku: SkuCode::new(row.insumo_sku),
            quantity: row.quantity,
            active: row.active,
        }
    }
}

#[async_trait]
impl EngineStore for PostgresStore {
    #[instrument(skip(self, order_skus), fields(count = order_skus.len()), err)]
    async fn find_active_mappings(
        &self,
        order_skus: &[SkuCode],
    ) -> Result<Vec<SkuMapping>, StorageError> {
        let rows: Vec<MappingRow> = sqlx::query_as(
            r#"
            SELECT id, order_sku, stock_sku, kit_sku, unit_multiplier, active, auto_detected, created_at
            FROM sku_mappings
            WHERE active AND order_sku = ANY($1)
            "#,
        )
        .bind(codes(order_skus))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_active_mappings", e))?;

        Ok(rows.into_iter().map(SkuMapping::from).collect())
    }

    #[instrument(skip(self), fields(order_sku = %order_sku), err)]
    async fn upsert_mapping_placeholder(&self, order_sku: &SkuCode) -> Result<(), StorageError> {
        let placeholder = SkuMapping::placeholder(order_sku.clone());
        sqlx::query(
            r#"
            INSERT INTO sku_mappings
                (id, order_sku, stock_sku, kit_sku, unit_multiplier, active, auto_detected, created_at)
            VALUES ($1, $2, NULL, NULL, $3, TRUE, TRUE, $4)
            ON CONFLICT (order_sku) DO NOTHING
            "#,
        )
        .bind(placeholder.id.as_uuid())
        .bind(placeholder.order_sku.as_str())
        .bind(placeholder.unit_multiplier)
        .bind(placeholder.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_mapping_placeholder", e))?;
        Ok(())
    }

    async fn find_stock_item(&self, sku: &SkuCode) -> Result<Option<StockItem>, StorageError> {
        let row: Option<StockItemRow> = sqlx::query_as(
            r#"
            SELECT sku, active, quantity_on_hand, minimum_quantity
            FROM stock_items
            WHERE sku = $1
            "#,
        )
        .bind(sku.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_stock_item", e))?;

        Ok(row.map(StockItem::from))
    }

    async fn find_location(
        &self,
        location_id: &LocationId,
    ) -> Result<Option<StockLocation>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT id, name FROM stock_locations WHERE id = $1
            "#,
        )
        .bind(location_id.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_location", e))?;

        row.map(|r| {
            Ok(StockLocation {
                id: LocationId::new(r.try_get::<String, _>("id").map_err(|e| {
                    StorageError::malformed("find_location", e.to_string())
                })?),
                name: r
                    .try_get::<String, _>("name")
                    .map_err(|e| StorageError::malformed("find_location", e.to_string()))?,
            })
        })
        .transpose()
    }

    async fn find_composition(
        &self,
        parent_sku: &SkuCode,
        location_id: Option<&LocationId>,
    ) -> Result<Vec<ComponentRequirement>, StorageError> {
        let rows: Vec<ComponentRow> = sqlx::query_as(
            r#"
            SELECT parent_sku, component_sku, quantity_per_unit, location_id
            FROM compositions
            WHERE parent_sku = $1 AND location_id IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(parent_sku.as_str())
        .bind(location_id.map(LocationId::as_str))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_composition", e))?;

        Ok(rows.into_iter().map(ComponentRequirement::from).collect())
    }

    async fn find_location_stock(
        &self,
        sku: &SkuCode,
        location_id: &LocationId,
    ) -> Result<Option<i64>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT quantity FROM location_stock WHERE sku = $1 AND location_id = $2
            "#,
        )
        .bind(sku.as_str())
        .bind(location_id.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_location_stock", e))?;

        row.map(|r| {
            r.try_get::<i64, _>("quantity")
                .map_err(|e| StorageError::malformed("find_location_stock", e.to_string()))
        })
        .transpose()
    }

    #[instrument(skip(self), fields(sku = %sku, location = %location_id, qty), err)]
    async fn try_decrement_location_stock(
        &self,
        sku: &SkuCode,
        location_id: &LocationId,
        qty: i64,
    ) -> Result<Option<i64>, StorageError> {
        // The WHERE guard makes the read-check-write a single atomic
        // statement; zero affected rows means insufficient stock.
        let row = sqlx::query(
            r#"
            UPDATE location_stock
            SET quantity = quantity - $3
            WHERE sku = $1 AND location_id = $2 AND quantity >= $3
            RETURNING quantity
            "#,
        )
        .bind(sku.as_str())
        .bind(location_id.as_str())
        .bind(qty)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("try_decrement_location_stock", e))?;

        row.map(|r| {
            r.try_get::<i64, _>("quantity").map_err(|e| {
                StorageError::malformed("try_decrement_location_stock", e.to_string())
            })
        })
        .transpose()
    }

    #[instrument(skip(self), fields(sku = %sku, location = %location_id, qty), err)]
    async fn increment_location_stock(
        &self,
        sku: &SkuCode,
        location_id: &LocationId,
        qty: i64,
    ) -> Result<i64, StorageError> {
        let row = sqlx::query(
            r#"
            INSERT INTO location_stock (sku, location_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (sku, location_id)
            DO UPDATE SET quantity = location_stock.quantity + EXCLUDED.quantity
            RETURNING quantity
            "#,
        )
        .bind(sku.as_str())
        .bind(location_id.as_str())
        .bind(qty)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("increment_location_stock", e))?;

        row.try_get::<i64, _>("quantity")
            .map_err(|e| StorageError::malformed("increment_location_stock", e.to_string()))
    }

    async fn sum_location_stock(&self, sku: &SkuCode) -> Result<i64, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(quantity), 0)::BIGINT AS total
            FROM location_stock
            WHERE sku = $1
            "#,
        )
        .bind(sku.as_str())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("sum_location_stock", e))?;

        row.try_get::<i64, _>("total")
            .map_err(|e| StorageError::malformed("sum_location_stock", e.to_string()))
    }

    async fn update_item_quantity(
        &self,
        sku: &SkuCode,
        quantity_on_hand: i64,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            UPDATE stock_items SET quantity_on_hand = $2 WHERE sku = $1
            "#,
        )
        .bind(sku.as_str())
        .bind(quantity_on_hand)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_item_quantity", e))?;
        Ok(())
    }

    async fn find_insumo_composition(
        &self,
        product_sku: &SkuCode,
    ) -> Result<Vec<InsumoRequirement>, StorageError> {
        let rows: Vec<InsumoRow> = sqlx::query_as(
            r#"
            SELECT product_sku, insumo_sku, quantity, active
            FROM insumo_compositions
            WHERE product_sku = $1 AND active
            "#,
        )
        .bind(product_sku.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_insumo_composition", e))?;

        Ok(rows.into_iter().map(InsumoRequirement::from).collect())
    }

    #[instrument(skip(self, insumo_skus), fields(count = insumo_skus.len()), err)]
    async fn find_insumo_stock(
        &self,
        insumo_skus: &[SkuCode],
        location_id: Option<&LocationId>,
    ) -> Result<HashMap<SkuCode, i64>, StorageError> {
        // Registered SKUs always land in the result; unregistered ones are
        // simply absent (the WHERE clause filters on the catalog table).
        let rows = match location_id {
            Some(location) => {
                sqlx::query(
                    r#"
                    SELECT i.sku AS sku, COALESCE(ls.quantity, 0) AS quantity
                    FROM stock_items i
                    LEFT JOIN location_stock ls
                        ON ls.sku = i.sku AND ls.location_id = $2
                    WHERE i.sku = ANY($1)
                    "#,
                )
                .bind(codes(insumo_skus))
                .bind(location.as_str())
                .fetch_all(&*self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT sku, quantity_on_hand AS quantity
                    FROM stock_items
                    WHERE sku = ANY($1)
                    "#,
                )
                .bind(codes(insumo_skus))
                .fetch_all(&*self.pool)
                .await
            }
        }
        .map_err(|e| map_sqlx_error("find_insumo_stock", e))?;

        let mut stock = HashMap::with_capacity(rows.len());
        for row in rows {
            let sku: String = row
                .try_get("sku")
                .map_err(|e| StorageError::malformed("find_insumo_stock", e.to_string()))?;
            let quantity: i64 = row
                .try_get("quantity")
                .map_err(|e| StorageError::malformed("find_insumo_stock", e.to_string()))?;
            stock.insert(SkuCode::new(sku), quantity);
        }
        Ok(stock)
    }
}
