use std::collections::HashMap;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{instrument, warn};

use stockwise_core::{EngineError, EngineResult, LocationId, SkuCode, SupplyStatus};
use stockwise_storage::EngineStore;

const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Shortfall detail for one registered insumo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsumoShortfall {
    pub insumo_sku: SkuCode,
    pub required: i64,
    pub available: i64,
}

/// Result of validating one product's supply materials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplyValidation {
    pub product_sku: SkuCode,
    pub status: SupplyStatus,
    /// Insumos referenced by the product but absent from the catalog.
    pub missing: Vec<SkuCode>,
    /// Registered insumos short of their per-line requirement.
    pub short: Vec<InsumoShortfall>,
    pub location_id: Option<LocationId>,
    pub location_name: Option<String>,
    /// Display-ready message for non-ready statuses.
    pub diagnostic: Option<String>,
}

/// A product whose validation failed outright (storage).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplyFailure {
    pub product_sku: SkuCode,
    pub error: EngineError,
}

/// Batch validation report; per-product failures are isolated here
/// instead of aborting sibling products.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplyBatchReport {
    pub results: HashMap<SkuCode, SupplyValidation>,
    pub failures: Vec<SupplyFailure>,
}

/// Validates per-order consumable materials for resolved stock SKUs.
#[derive(Debug, Clone)]
pub struct SupplyValidator<S> {
    store: S,
    max_concurrency: usize,
}

impl<S: EngineStore> SupplyValidator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Bound for concurrent per-SKU validations in [`Self::validate_batch`].
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Validate one product's insumos.
    ///
    /// Status ladder: no active insumo rows is `NO_INSUMO_MAPPING` (a
    /// valid state); any referenced insumo missing from the catalog is
    /// `INSUMO_NOT_REGISTERED`; any registered insumo short of its
    /// per-line requirement is `INSUMO_PENDING`; otherwise `READY`.
    ///
    /// With a location, availability is the location entry rather than
    /// aggregate on-hand, and the result carries the location name.
    #[instrument(skip(self), fields(product = %product_sku))]
    pub async fn validate(
        &self,
        product_sku: &SkuCode,
        location_id: Option<&LocationId>,
    ) -> EngineResult<SupplyValidation> {
        let requirements = self
            .store
            .find_insumo_composition(product_sku)
            .await
            .map_err(|e| EngineError::storage_for(product_sku.clone(), e))?;

        let location_name = match location_id {
            Some(location) => self.location_name(location).await,
            None => None,
        };

        if requirements.is_empty() {
            return Ok(SupplyValidation {
                product_sku: product_sku.clone(),
                status: SupplyStatus::NoInsumoMapping,
                missing: Vec::new(),
                short: Vec::new(),
                location_id: location_id.cloned(),
                location_name,
                diagnostic: None,
            });
        }

        let insumo_skus: Vec<SkuCode> = requirements.iter().map(|r| r.insumo_sku.clone()).collect();
        let stock = self
            .store
            .find_insumo_stock(&insumo_skus, location_id)
            .await
            .map_err(|e| EngineError::storage_for(product_sku.clone(), e))?;

        let mut missing = Vec::new();
        let mut short = Vec::new();
        for requirement in &requirements {
            match stock.get(&requirement.insumo_sku) {
                None => missing.push(requirement.insumo_sku.clone()),
                Some(&available) => {
                    let required = requirement.required_per_line();
                    if available < required {
                        short.push(InsumoShortfall {
                            insumo_sku: requirement.insumo_sku.clone(),
                            required,
                            available,
                        });
                    }
                }
            }
        }

        let (status, diagnostic) = if !missing.is_empty() {
            let listed: Vec<&str> = missing.iter().map(SkuCode::as_str).collect();
            (
                SupplyStatus::InsumoNotRegistered,
                Some(format!(
                    "insumos not registered for {product_sku}: {}",
                    listed.join(", ")
                )),
            )
        } else if !short.is_empty() {
            let place = location_name
                .clone()
                .unwrap_or_else(|| "all locations".to_string());
            let listed: Vec<String> = short
                .iter()
                .map(|s| {
                    format!(
                        "{} required {}, available {}",
                        s.insumo_sku, s.required, s.available
                    )
                })
                .collect();
            (
                SupplyStatus::InsumoPending,
                Some(format!(
                    "insufficient insumo stock at {place}: {}",
                    listed.join("; ")
                )),
            )
        } else {
            (SupplyStatus::Ready, None)
        };

        Ok(SupplyValidation {
            product_sku: product_sku.clone(),
            status,
            missing,
            short,
            location_id: location_id.cloned(),
            location_name,
            diagnostic,
        })
    }

    /// Validate many products; per-SKU work is independent and fanned out
    /// with bounded concurrency.
    #[instrument(skip(self, product_skus), fields(count = product_skus.len()))]
    pub async fn validate_batch(
        &self,
        product_skus: &[SkuCode],
        location_id: Option<&LocationId>,
    ) -> SupplyBatchReport {
        let outcomes: Vec<(SkuCode, EngineResult<SupplyValidation>)> =
            stream::iter(product_skus.iter().cloned())
                .map(|product_sku| async move {
                    let outcome = self.validate(&product_sku, location_id).await;
                    (product_sku, outcome)
                })
                .buffer_unordered(self.max_concurrency)
                .collect()
                .await;

        let mut report = SupplyBatchReport::default();
        for (product_sku, outcome) in outcomes {
            match outcome {
                Ok(validation) => {
                    report.results.insert(product_sku, validation);
                }
                Err(error) => report.failures.push(SupplyFailure { product_sku, error }),
            }
        }
        report
    }

    async fn location_name(&self, location_id: &LocationId) -> Option<String> {
        match self.store.find_location(location_id).await {
            Ok(found) => found.map(|l| l.name),
            Err(err) => {
                warn!(location = %location_id, error = %err, "location lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stockwise_catalog::{InsumoRequirement, StockItem, StockLocation};
    use stockwise_storage::InMemoryStore;

    use super::*;

    fn sku(code: &str) -> SkuCode {
        SkuCode::new(code)
    }

    fn loc(id: &str) -> LocationId {
        LocationId::new(id)
    }

    fn store_with_product() -> Arc<InMemoryStore> {
        let store = InMemoryStore::new();
        store.put_item(StockItem {
            sku: sku("PROD-1"),
            active: true,
            quantity_on_hand: 50,
            minimum_quantity: 0,
        });
        Arc::new(store)
    }

    fn label(store: &InMemoryStore, on_hand: i64) {
        store.put_item(StockItem {
            sku: sku("LABEL-1"),
            active: true,
            quantity_on_hand: on_hand,
            minimum_quantity: 0,
        });
        store.put_insumo(InsumoRequirement {
            product_sku: sku("PROD-1"),
            insumo_sku: sku("LABEL-1"),
            quantity: 1,
            active: true,
        });
    }

    #[tokio::test]
    async fn product_without_insumos_is_a_valid_state() {
        let store = store_with_product();
        let validator = SupplyValidator::new(store);

        let result = validator.validate(&sku("PROD-1"), None).await.unwrap();

        assert_eq!(result.status, SupplyStatus::NoInsumoMapping);
        assert!(result.diagnostic.is_none());
    }

    #[tokio::test]
    async fn unregistered_insumo_dominates_and_is_listed() {
        let store = store_with_product();
        label(&store, 0);
        store.put_insumo(InsumoRequirement {
            product_sku: sku("PROD-1"),
            insumo_sku: sku("GHOST-TAG"),
            quantity: 1,
            active: true,
        });
        let validator = SupplyValidator::new(store);

        let result = validator.validate(&sku("PROD-1"), None).await.unwrap();

        // LABEL-1 is short too, but missing registration outranks it.
        assert_eq!(result.status, SupplyStatus::InsumoNotRegistered);
        assert_eq!(result.missing, vec![sku("GHOST-TAG")]);
        assert!(result.diagnostic.unwrap().contains("GHOST-TAG"));
    }

    #[tokio::test]
    async fn empty_insumo_stock_is_pending_with_detail() {
        let store = store_with_product();
        label(&store, 0);
        let validator = SupplyValidator::new(store);

        let result = validator.validate(&sku("PROD-1"), None).await.unwrap();

        assert_eq!(result.status, SupplyStatus::InsumoPending);
        assert_eq!(
            result.short,
            vec![InsumoShortfall {
                insumo_sku: sku("LABEL-1"),
                required: 1,
                available: 0,
            }]
        );
        let diagnostic = result.diagnostic.unwrap();
        assert!(diagnostic.contains("LABEL-1"));
        assert!(diagnostic.contains("required 1"));
    }

    #[tokio::test]
    async fn one_unit_on_hand_is_ready() {
        let store = store_with_product();
        label(&store, 1);
        let validator = SupplyValidator::new(store);

        let result = validator.validate(&sku("PROD-1"), None).await.unwrap();

        assert_eq!(result.status, SupplyStatus::Ready);
        assert!(result.short.is_empty());
    }

    #[tokio::test]
    async fn dirty_zero_quantity_row_still_requires_one_unit() {
        let store = store_with_product();
        store.put_item(StockItem {
            sku: sku("LABEL-1"),
            active: true,
            quantity_on_hand: 0,
            minimum_quantity: 0,
        });
        store.put_insumo(InsumoRequirement {
            product_sku: sku("PROD-1"),
            insumo_sku: sku("LABEL-1"),
            quantity: 0,
            active: true,
        });
        let validator = SupplyValidator::new(store);

        let result = validator.validate(&sku("PROD-1"), None).await.unwrap();

        assert_eq!(result.status, SupplyStatus::InsumoPending);
    }

    #[tokio::test]
    async fn location_scoped_validation_checks_the_location_entry() {
        let store = store_with_product();
        label(&store, 10);
        store.put_location(StockLocation {
            id: loc("L1"),
            name: "Main warehouse".to_string(),
        });
        store.put_location_stock(sku("LABEL-1"), loc("L1"), 0);
        let validator = SupplyValidator::new(store);

        let aggregate = validator.validate(&sku("PROD-1"), None).await.unwrap();
        assert_eq!(aggregate.status, SupplyStatus::Ready);

        let scoped = validator
            .validate(&sku("PROD-1"), Some(&loc("L1")))
            .await
            .unwrap();
        assert_eq!(scoped.status, SupplyStatus::InsumoPending);
        assert_eq!(scoped.location_name.as_deref(), Some("Main warehouse"));
    }

    #[tokio::test]
    async fn batch_reports_every_product_independently() {
        let store = store_with_product();
        label(&store, 1);
        store.put_item(StockItem {
            sku: sku("PROD-2"),
            active: true,
            quantity_on_hand: 5,
            minimum_quantity: 0,
        });
        let validator = SupplyValidator::new(store);

        let report = validator
            .validate_batch(&[sku("PROD-1"), sku("PROD-2")], None)
            .await;

        assert!(report.failures.is_empty());
        assert_eq!(report.results[&sku("PROD-1")].status, SupplyStatus::Ready);
        assert_eq!(
            report.results[&sku("PROD-2")].status,
            SupplyStatus::NoInsumoMapping
        );
    }
}
