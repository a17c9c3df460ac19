use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use stockwise_catalog::{
    ComponentRequirement, InsumoRequirement, SkuMapping, StockItem, StockLocation,
};
use stockwise_core::{LocationId, SkuCode};

use crate::error::StorageError;

/// Persistence operations the resolution engine consumes.
///
/// Implementations own tenant scoping: one store handle serves exactly one
/// organization, so no tenant parameter appears here.
///
/// ## Batch lookups
///
/// `find_active_mappings` and `find_insumo_stock` take slices and must be
/// single round-trips; resolution latency is dominated by them.
///
/// ## Mutations
///
/// The two mutating operations are the engine's only contention points:
///
/// - `try_decrement_location_stock` must be atomic at the row level (a
///   compare-and-swap, or a `WHERE quantity >= qty` conditional update) so
///   that concurrent decrements can never drive a quantity negative.
///   Losers of a race get `None`, never a silent overwrite.
/// - `upsert_mapping_placeholder` must be idempotent on `order_sku`
///   (ignore-on-conflict) so that concurrent first-sight of the same
///   unseen SKU creates exactly one row.
#[async_trait]
pub trait EngineStore: Send + Sync {
    /// Active mappings for the given order SKUs.
    async fn find_active_mappings(
        &self,
        order_skus: &[SkuCode],
    ) -> Result<Vec<SkuMapping>, StorageError>;

    /// Park a placeholder mapping for an unseen order SKU.
    ///
    /// No-op if any mapping row for `order_sku` already exists.
    async fn upsert_mapping_placeholder(&self, order_sku: &SkuCode) -> Result<(), StorageError>;

    /// Catalog record for a stock SKU; `None` when not registered.
    async fn find_stock_item(&self, sku: &SkuCode) -> Result<Option<StockItem>, StorageError>;

    /// Location master record; `None` when unknown.
    async fn find_location(
        &self,
        location_id: &LocationId,
    ) -> Result<Option<StockLocation>, StorageError>;

    /// Composition rows for a parent, scoped to a location when given.
    ///
    /// With `Some(location)`, only rows registered for that exact location
    /// count; with `None`, only location-agnostic rows. Zero rows means
    /// "no composition at this scope", never "zero-cost kit".
    async fn find_composition(
        &self,
        parent_sku: &SkuCode,
        location_id: Option<&LocationId>,
    ) -> Result<Vec<ComponentRequirement>, StorageError>;

    /// Quantity of `sku` at `location_id`; `None` when the SKU has no
    /// entry there (a normal "not stocked here" answer, not an error).
    async fn find_location_stock(
        &self,
        sku: &SkuCode,
        location_id: &LocationId,
    ) -> Result<Option<i64>, StorageError>;

    /// Atomically decrement a location entry if it holds at least `qty`.
    ///
    /// Returns the new location quantity, or `None` when the guard failed
    /// (insufficient stock, or no entry at all). Callers validate
    /// `qty > 0` before reaching the store.
    async fn try_decrement_location_stock(
        &self,
        sku: &SkuCode,
        location_id: &LocationId,
        qty: i64,
    ) -> Result<Option<i64>, StorageError>;

    /// Add stock to a location entry, creating the entry if absent.
    /// Returns the new location quantity.
    async fn increment_location_stock(
        &self,
        sku: &SkuCode,
        location_id: &LocationId,
        qty: i64,
    ) -> Result<i64, StorageError>;

    /// Sum of the SKU's quantities across all locations.
    async fn sum_location_stock(&self, sku: &SkuCode) -> Result<i64, StorageError>;

    /// Write back the SKU's aggregate on-hand quantity.
    ///
    /// Best-effort consistency; callers must never gate a decrement on
    /// this value.
    async fn update_item_quantity(
        &self,
        sku: &SkuCode,
        quantity_on_hand: i64,
    ) -> Result<(), StorageError>;

    /// Active insumo requirements for a product stock SKU.
    async fn find_insumo_composition(
        &self,
        product_sku: &SkuCode,
    ) -> Result<Vec<InsumoRequirement>, StorageError>;

    /// On-hand quantity per registered insumo SKU.
    ///
    /// A SKU absent from the result is not registered in the catalog.
    /// Registered SKUs always map to a quantity: aggregate on-hand by
    /// default, or the location entry (0 when none exists there) when a
    /// location is given.
    async fn find_insumo_stock(
        &self,
        insumo_skus: &[SkuCode],
        location_id: Option<&LocationId>,
    ) -> Result<HashMap<SkuCode, i64>, StorageError>;
}

#[async_trait]
impl<S> EngineStore for Arc<S>
where
    S: EngineStore + ?Sized,
{
    async fn find_active_mappings(
        &self,
        order_skus: &[SkuCode],
    ) -> Result<Vec<SkuMapping>, StorageError> {
        (**self).find_active_mappings(order_skus).await
    }

    async fn upsert_mapping_placeholder(&self, order_sku: &SkuCode) -> Result<(), StorageError> {
        (**self).upsert_mapping_placeholder(order_sku).await
    }

    async fn find_stock_item(&self, sku: &SkuCode) -> Result<Option<StockItem>, StorageError> {
        (**self).find_stock_item(sku).await
    }

    async fn find_location(
        &self,
        location_id: &LocationId,
    ) -> Result<Option<StockLocation>, StorageError> {
        (**self).find_location(location_id).await
    }

    async fn find_composition(
        &self,
        parent_sku: &SkuCode,
        location_id: Option<&LocationId>,
    ) -> Result<Vec<ComponentRequirement>, StorageError> {
        (**self).find_composition(parent_sku, location_id).await
    }

    async fn find_location_stock(
        &self,
        sku: &SkuCode,
        location_id: &LocationId,
    ) -> Result<Option<i64>, StorageError> {
        (**self).find_location_stock(sku, location_id).await
    }

    async fn try_decrement_location_stock(
        &self,
        sku: &SkuCode,
        location_id: &LocationId,
        qty: i64,
    ) -> Result<Option<i64>, StorageError> {
        (**self)
            .try_decrement_location_stock(sku, location_id, qty)
            .await
    }

    async fn increment_location_stock(
        &self,
        sku: &SkuCode,
        location_id: &LocationId,
        qty: i64,
    ) -> Result<i64, StorageError> {
        (**self)
            .increment_location_stock(sku, location_id, qty)
            .await
    }

    async fn sum_location_stock(&self, sku: &SkuCode) -> Result<i64, StorageError> {
        (**self).sum_location_stock(sku).await
    }

    async fn update_item_quantity(
        &self,
        sku: &SkuCode,
        quantity_on_hand: i64,
    ) -> Result<(), StorageError> {
        (**self).update_item_quantity(sku, quantity_on_hand).await
    }

    async fn find_insumo_composition(
        &self,
        product_sku: &SkuCode,
    ) -> Result<Vec<InsumoRequirement>, StorageError> {
        (**self).find_insumo_composition(product_sku).await
    }

    async fn find_insumo_stock(
        &self,
        insumo_skus: &[SkuCode],
        location_id: Option<&LocationId>,
    ) -> Result<HashMap<SkuCode, i64>, StorageError> {
        (**self).find_insumo_stock(insumo_skus, location_id).await
    }
}
