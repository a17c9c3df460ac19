use serde::Serialize;

use stockwise_catalog::ComponentRequirement;
use stockwise_core::{EngineError, EngineResult, LocationId, SkuCode};
use stockwise_ledger::StockLocationLedger;
use stockwise_storage::EngineStore;

/// A component that cannot cover its share of an ordered quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentShortfall {
    pub component_sku: SkuCode,
    pub required: i64,
    pub available: i64,
}

/// Result of evaluating a kit's components against an ordered quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentCheck {
    pub sufficient: bool,
    pub shortfalls: Vec<ComponentShortfall>,
}

/// Determines whether a stock SKU is a kit at a given location and
/// whether its components can cover an ordered quantity.
#[derive(Debug, Clone)]
pub struct CompositionResolver<S> {
    store: S,
    ledger: StockLocationLedger<S>,
}

impl<S: EngineStore + Clone> CompositionResolver<S> {
    pub fn new(store: S) -> Self {
        Self {
            ledger: StockLocationLedger::new(store.clone()),
            store,
        }
    }

    /// Composition rows for the parent at the queried scope.
    pub async fn components(
        &self,
        parent_sku: &SkuCode,
        location_id: Option<&LocationId>,
    ) -> EngineResult<Vec<ComponentRequirement>> {
        self.store
            .find_composition(parent_sku, location_id)
            .await
            .map_err(|e| EngineError::storage_for(parent_sku.clone(), e))
    }

    /// True only if at least one composition row exists for the parent at
    /// the queried scope.
    ///
    /// A parent absent from the composition catalog and a parent with
    /// zero rows at the queried location both report `false`: a SKU can
    /// be a kit at location A and a simple item at location B.
    pub async fn has_composition(
        &self,
        parent_sku: &SkuCode,
        location_id: Option<&LocationId>,
    ) -> EngineResult<bool> {
        Ok(!self.components(parent_sku, location_id).await?.is_empty())
    }

    /// Evaluate every component's availability for `ordered_units` of the
    /// parent, reporting the full shortfall list for diagnostics.
    pub async fn check_components(
        &self,
        parent_sku: &SkuCode,
        location_id: Option<&LocationId>,
        ordered_units: i64,
    ) -> EngineResult<ComponentCheck> {
        let components = self.components(parent_sku, location_id).await?;

        let mut shortfalls = Vec::new();
        for component in &components {
            let required = component.required_for(ordered_units);
            let available = self
                .component_on_hand(&component.component_sku, location_id)
                .await?;
            if available < required {
                shortfalls.push(ComponentShortfall {
                    component_sku: component.component_sku.clone(),
                    required,
                    available,
                });
            }
        }

        Ok(ComponentCheck {
            sufficient: shortfalls.is_empty(),
            shortfalls,
        })
    }

    /// Short-circuiting variant of [`Self::check_components`]: stops at
    /// the first failing component.
    pub async fn is_component_stock_sufficient(
        &self,
        parent_sku: &SkuCode,
        location_id: Option<&LocationId>,
        ordered_units: i64,
    ) -> EngineResult<bool> {
        for component in self.components(parent_sku, location_id).await? {
            let required = component.required_for(ordered_units);
            let available = self
                .component_on_hand(&component.component_sku, location_id)
                .await?;
            if available < required {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Component availability at the queried scope: the location entry
    /// when a location is given, aggregate on-hand otherwise.
    async fn component_on_hand(
        &self,
        sku: &SkuCode,
        location_id: Option<&LocationId>,
    ) -> EngineResult<i64> {
        match location_id {
            Some(location) => self.ledger.on_hand(sku, location).await,
            None => Ok(self
                .store
                .find_stock_item(sku)
                .await
                .map_err(|e| EngineError::storage_for(sku.clone(), e))?
                .map(|item| item.quantity_on_hand)
                .unwrap_or(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stockwise_catalog::{StockItem, StockLocation};
    use stockwise_storage::InMemoryStore;

    use super::*;

    fn sku(code: &str) -> SkuCode {
        SkuCode::new(code)
    }

    fn loc(id: &str) -> LocationId {
        LocationId::new(id)
    }

    fn kit_store() -> Arc<InMemoryStore> {
        let store = InMemoryStore::new();
        store.put_location(StockLocation {
            id: loc("L1"),
            name: "Main warehouse".to_string(),
        });
        for (code, on_hand) in [("PART-A", 6), ("PART-B", 3)] {
            store.put_item(StockItem {
                sku: sku(code),
                active: true,
                quantity_on_hand: on_hand,
                minimum_quantity: 0,
            });
            store.put_location_stock(sku(code), loc("L1"), on_hand);
        }
        store.put_component(ComponentRequirement {
            parent_sku: sku("KIT-1"),
            component_sku: sku("PART-A"),
            quantity_per_unit: 2,
            location_id: Some(loc("L1")),
        });
        store.put_component(ComponentRequirement {
            parent_sku: sku("KIT-1"),
            component_sku: sku("PART-B"),
            quantity_per_unit: 1,
            location_id: Some(loc("L1")),
        });
        Arc::new(store)
    }

    #[tokio::test]
    async fn composition_presence_is_location_exact() {
        let resolver = CompositionResolver::new(kit_store());

        assert!(resolver
            .has_composition(&sku("KIT-1"), Some(&loc("L1")))
            .await
            .unwrap());
        assert!(!resolver
            .has_composition(&sku("KIT-1"), Some(&loc("L2")))
            .await
            .unwrap());
        assert!(!resolver
            .has_composition(&sku("PART-A"), Some(&loc("L1")))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn components_cover_exactly_the_scaled_requirement() {
        let resolver = CompositionResolver::new(kit_store());

        // 3 kits need PART-A >= 6 and PART-B >= 3; both hold exactly.
        assert!(resolver
            .is_component_stock_sufficient(&sku("KIT-1"), Some(&loc("L1")), 3)
            .await
            .unwrap());
        assert!(!resolver
            .is_component_stock_sufficient(&sku("KIT-1"), Some(&loc("L1")), 4)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn check_names_every_short_component() {
        let store = kit_store();
        store.put_location_stock(sku("PART-A"), loc("L1"), 5);
        let resolver = CompositionResolver::new(store);

        let check = resolver
            .check_components(&sku("KIT-1"), Some(&loc("L1")), 3)
            .await
            .unwrap();

        assert!(!check.sufficient);
        assert_eq!(
            check.shortfalls,
            vec![ComponentShortfall {
                component_sku: sku("PART-A"),
                required: 6,
                available: 5,
            }]
        );
    }

    #[tokio::test]
    async fn unscoped_check_falls_back_to_aggregate_stock() {
        let store = InMemoryStore::new();
        store.put_item(StockItem {
            sku: sku("PART-A"),
            active: true,
            quantity_on_hand: 4,
            minimum_quantity: 0,
        });
        store.put_component(ComponentRequirement {
            parent_sku: sku("KIT-1"),
            component_sku: sku("PART-A"),
            quantity_per_unit: 2,
            location_id: None,
        });
        let resolver = CompositionResolver::new(Arc::new(store));

        assert!(resolver
            .is_component_stock_sufficient(&sku("KIT-1"), None, 2)
            .await
            .unwrap());
        assert!(!resolver
            .is_component_stock_sufficient(&sku("KIT-1"), None, 3)
            .await
            .unwrap());
    }
}
