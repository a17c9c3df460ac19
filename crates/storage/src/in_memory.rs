use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use stockwise_catalog::{
    ComponentRequirement, InsumoRequirement, SkuMapping, StockItem, StockLocation,
};
use stockwise_core::{LocationId, SkuCode};

use crate::error::StorageError;
use crate::store::EngineStore;

#[derive(Debug, Default)]
struct Inner {
    items: HashMap<SkuCode, StockItem>,
    locations: HashMap<LocationId, StockLocation>,
    location_stock: HashMap<(SkuCode, LocationId), i64>,
    /// Keyed by order SKU; the key space enforces the one-row-per-order-SKU
    /// invariant the SQL schema enforces with a unique index.
    mappings: HashMap<SkuCode, SkuMapping>,
    compositions: Vec<ComponentRequirement>,
    insumos: Vec<InsumoRequirement>,
}

/// In-memory [`EngineStore`].
///
/// Intended for tests/dev. Guarded mutations run under the write lock, so
/// the decrement guard is atomic exactly like the SQL conditional update.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_item(&self, item: StockItem) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.items.insert(item.sku.clone(), item);
    }

    pub fn put_location(&self, location: StockLocation) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.locations.insert(location.id.clone(), location);
    }

    pub fn put_location_stock(&self, sku: SkuCode, location_id: LocationId, quantity: i64) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.location_stock.insert((sku, location_id), quantity);
    }

    pub fn put_mapping(&self, mapping: SkuMapping) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.mappings.insert(mapping.order_sku.clone(), mapping);
    }

    pub fn put_component(&self, component: ComponentRequirement) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.compositions.push(component);
    }

    pub fn put_insumo(&self, insumo: InsumoRequirement) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.insumos.push(insumo);
    }

    /// Mapping row for an order SKU, whatever its state (test
    /// introspection).
    pub fn mapping(&self, order_sku: &SkuCode) -> Option<SkuMapping> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.mappings.get(order_sku).cloned()
    }

    pub fn mapping_count(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.mappings.len()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StorageError> {
        self.inner
            .read()
            .map_err(|_| StorageError::Connection("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StorageError> {
        self.inner
            .write()
            .map_err(|_| StorageError::Connection("lock poisoned".to_string()))
    }
}

#[async_trait]
impl EngineStore for InMemoryStore {
    async fn find_active_mappings(
        &self,
        order_skus: &[SkuCode],
    ) -> Result<Vec<SkuMapping>, StorageError> {
        let inner = self.read()?;
        Ok(order_skus
            .iter()
            .filter_map(|sku| inner.mappings.get(sku))
            .filter(|m| m.active)
            .cloned()
            .collect())
    }

    async fn upsert_mapping_placeholder(&self, order_sku: &SkuCode) -> Result<(), StorageError> {
        let mut inner = self.write()?;
        inner
            .mappings
            .entry(order_sku.clone())
            .or_insert_with(|| SkuMapping::placeholder(order_sku.clone()));
        Ok(())
    }

    async fn find_stock_item(&self, sku: &SkuCode) -> Result<Option<StockItem>, StorageError> {
        Ok(self.read()?.items.get(sku).cloned())
    }

    async fn find_location(
        &self,
        location_id: &LocationId,
    ) -> Result<Option<StockLocation>, StorageError> {
        Ok(self.read()?.locations.get(location_id).cloned())
    }

    async fn find_composition(
        &self,
        parent_sku: &SkuCode,
        location_id: Option<&LocationId>,
    ) -> Result<Vec<ComponentRequirement>, StorageError> {
        let inner = self.read()?;
        Ok(inner
            .compositions
            .iter()
            .filter(|c| &c.parent_sku == parent_sku && c.location_id.as_ref() == location_id)
            .cloned()
            .collect())
    }

    async fn find_location_stock(
        &self,
        sku: &SkuCode,
        location_id: &LocationId,
    ) -> Result<Option<i64>, StorageError> {
        let inner = self.read()?;
        Ok(inner
            .location_stock
            .get(&(sku.clone(), location_id.clone()))
            .copied())
    }

    async fn try_decrement_location_stock(
        &self,
        sku: &SkuCode,
        location_id: &LocationId,
        qty: i64,
    ) -> Result<Option<i64>, StorageError> {
        let mut inner = self.write()?;
        let Some(quantity) = inner.location_stock.get_mut(&(sku.clone(), location_id.clone()))
        else {
            return Ok(None);
        };
        if *quantity < qty {
            return Ok(None);
        }
        *quantity -= qty;
        Ok(Some(*quantity))
    }

    async fn increment_location_stock(
        &self,
        sku: &SkuCode,
        location_id: &LocationId,
        qty: i64,
    ) -> Result<i64, StorageError> {
        let mut inner = self.write()?;
        let quantity = inner
            .location_stock
            .entry((sku.clone(), location_id.clone()))
            .or_insert(0);
        *quantity = quantity.saturating_add(qty);
        Ok(*quantity)
    }

    async fn sum_location_stock(&self, sku: &SkuCode) -> Result<i64, StorageError> {
        let inner = self.read()?;
        Ok(inner
            .location_stock
            .iter()
            .filter(|((s, _), _)| s == sku)
            .map(|(_, qty)| qty)
            .sum())
    }

    async fn update_item_quantity(
        &self,
        sku: &SkuCode,
        quantity_on_hand: i64,
    ) -> Result<(), StorageError> {
        let mut inner = self.write()?;
        if let Some(item) = inner.items.get_mut(sku) {
            item.quantity_on_hand = quantity_on_hand;
        }
        Ok(())
    }

    async fn find_insumo_composition(
        &self,
        product_sku: &SkuCode,
    ) -> Result<Vec<InsumoRequirement>, StorageError> {
        let inner = self.read()?;
        Ok(inner
            .insumos
            .iter()
            .filter(|i| &i.product_sku == product_sku && i.active)
            .cloned()
            .collect())
    }

    async fn find_insumo_stock(
        &self,
        insumo_skus: &[SkuCode],
        location_id: Option<&LocationId>,
    ) -> Result<HashMap<SkuCode, i64>, StorageError> {
        let inner = self.read()?;
        let mut stock = HashMap::with_capacity(insumo_skus.len());
        for sku in insumo_skus {
            let Some(item) = inner.items.get(sku) else {
                // Not registered: absent from the result by contract.
                continue;
            };
            let quantity = match location_id {
                Some(loc) => inner
                    .location_stock
                    .get(&(sku.clone(), loc.clone()))
                    .copied()
                    .unwrap_or(0),
                None => item.quantity_on_hand,
            };
            stock.insert(sku.clone(), quantity);
        }
        Ok(stock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sku(code: &str) -> SkuCode {
        SkuCode::new(code)
    }

    fn loc(id: &str) -> LocationId {
        LocationId::new(id)
    }

    #[tokio::test]
    async fn placeholder_upsert_is_idempotent() {
        let store = InMemoryStore::new();
        let order_sku = sku("CH-NEW");

        store.upsert_mapping_placeholder(&order_sku).await.unwrap();
        let first = store.mapping(&order_sku).unwrap();

        store.upsert_mapping_placeholder(&order_sku).await.unwrap();
        let second = store.mapping(&order_sku).unwrap();

        assert_eq!(store.mapping_count(), 1);
        assert_eq!(first.id, second.id);
        assert!(second.auto_detected);
    }

    #[tokio::test]
    async fn guarded_decrement_refuses_to_go_negative() {
        let store = InMemoryStore::new();
        store.put_location_stock(sku("STK-1"), loc("L1"), 3);

        assert_eq!(
            store
                .try_decrement_location_stock(&sku("STK-1"), &loc("L1"), 5)
                .await
                .unwrap(),
            None
        );
        assert_eq!(
            store
                .try_decrement_location_stock(&sku("STK-1"), &loc("L1"), 3)
                .await
                .unwrap(),
            Some(0)
        );
        // No entry at all: the guard fails, nothing is created.
        assert_eq!(
            store
                .try_decrement_location_stock(&sku("STK-1"), &loc("L2"), 1)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn insumo_stock_distinguishes_unregistered_from_empty() {
        let store = InMemoryStore::new();
        store.put_item(StockItem {
            sku: sku("LABEL-1"),
            active: true,
            quantity_on_hand: 0,
            minimum_quantity: 0,
        });

        let stock = store
            .find_insumo_stock(&[sku("LABEL-1"), sku("GHOST")], None)
            .await
            .unwrap();

        assert_eq!(stock.get(&sku("LABEL-1")), Some(&0));
        assert!(!stock.contains_key(&sku("GHOST")));
    }

    #[tokio::test]
    async fn insumo_stock_uses_location_entry_when_scoped() {
        let store = InMemoryStore::new();
        store.put_item(StockItem {
            sku: sku("LABEL-1"),
            active: true,
            quantity_on_hand: 10,
            minimum_quantity: 0,
        });
        store.put_location_stock(sku("LABEL-1"), loc("L1"), 2);

        let aggregate = store.find_insumo_stock(&[sku("LABEL-1")], None).await.unwrap();
        assert_eq!(aggregate.get(&sku("LABEL-1")), Some(&10));

        let scoped = store
            .find_insumo_stock(&[sku("LABEL-1")], Some(&loc("L1")))
            .await
            .unwrap();
        assert_eq!(scoped.get(&sku("LABEL-1")), Some(&2));

        // Registered but no entry at the queried location: zero, not absent.
        let elsewhere = store
            .find_insumo_stock(&[sku("LABEL-1")], Some(&loc("L2")))
            .await
            .unwrap();
        assert_eq!(elsewhere.get(&sku("LABEL-1")), Some(&0));
    }

    #[tokio::test]
    async fn composition_scope_is_exact() {
        let store = InMemoryStore::new();
        store.put_component(ComponentRequirement {
            parent_sku: sku("KIT-1"),
            component_sku: sku("PART-A"),
            quantity_per_unit: 1,
            location_id: Some(loc("L1")),
        });

        assert_eq!(
            store
                .find_composition(&sku("KIT-1"), Some(&loc("L1")))
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(store
            .find_composition(&sku("KIT-1"), Some(&loc("L2")))
            .await
            .unwrap()
            .is_empty());
        assert!(store
            .find_composition(&sku("KIT-1"), None)
            .await
            .unwrap()
            .is_empty());
    }
}
