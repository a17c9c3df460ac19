use std::collections::{HashMap, HashSet};

use futures::stream::{self, StreamExt};
use tracing::{debug, instrument, warn};

use stockwise_catalog::SkuMapping;
use stockwise_core::{EngineError, EngineResult, FulfillmentStatus, LocationId, SkuCode};
use stockwise_ledger::{DecrementReport, OrderLine, StockLocationLedger};
use stockwise_storage::EngineStore;
use stockwise_supply::{SupplyBatchReport, SupplyValidator};

use crate::composition::CompositionResolver;
use crate::result::{BatchResolution, LineFailure, ResolutionResult};

/// Tuning for batch resolution.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Upper bound on concurrent per-line resolutions. Keeps batch
    /// fan-out within the backing store's connection budget.
    pub max_concurrency: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { max_concurrency: 8 }
    }
}

/// Primary entry point: resolves order-line SKUs into readiness statuses.
///
/// Stateless between calls; all state lives behind the injected store.
#[derive(Debug, Clone)]
pub struct ReadinessResolver<S> {
    store: S,
    compositions: CompositionResolver<S>,
    ledger: StockLocationLedger<S>,
    supply: SupplyValidator<S>,
    config: ResolverConfig,
}

impl<S: EngineStore + Clone> ReadinessResolver<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, ResolverConfig::default())
    }

    pub fn with_config(store: S, config: ResolverConfig) -> Self {
        Self {
            compositions: CompositionResolver::new(store.clone()),
            ledger: StockLocationLedger::new(store.clone()),
            supply: SupplyValidator::new(store.clone()).with_max_concurrency(config.max_concurrency),
            store,
            config,
        }
    }

    pub fn ledger(&self) -> &StockLocationLedger<S> {
        &self.ledger
    }

    pub fn supply(&self) -> &SupplyValidator<S> {
        &self.supply
    }

    pub fn compositions(&self) -> &CompositionResolver<S> {
        &self.compositions
    }

    /// Resolve a batch of order-line SKUs against an optional location.
    ///
    /// One batched mapping lookup, placeholder creation for unseen order
    /// SKUs, then an independent status ladder per line (bounded fan-out,
    /// results in input order). Only a failed mapping lookup aborts the
    /// batch; later per-line failures land in the report's `failures`.
    #[instrument(skip(self, order_skus, qty_by_sku), fields(lines = order_skus.len()))]
    pub async fn resolve_batch(
        &self,
        order_skus: &[SkuCode],
        location_id: Option<&LocationId>,
        qty_by_sku: Option<&HashMap<SkuCode, i64>>,
    ) -> EngineResult<BatchResolution> {
        let mappings = self.load_mappings(order_skus).await?;
        let location_name = match location_id {
            Some(location) => self.location_name(location).await,
            None => None,
        };
        let park_failures = self.park_placeholders(order_skus, &mappings).await;

        let outcomes: Vec<(usize, SkuCode, EngineResult<ResolutionResult>)> =
            stream::iter(order_skus.iter().cloned().enumerate().map(|(idx, order_sku)| {
                let mapping = mappings.get(&order_sku).cloned();
                let ordered_qty = qty_by_sku
                    .and_then(|by_sku| by_sku.get(&order_sku).copied())
                    .unwrap_or(1);
                let park_error = park_failures.get(&order_sku).cloned();
                let location_name = location_name.clone();
                async move {
                    let outcome = self
                        .resolve_line(
                            &order_sku,
                            mapping,
                            location_id,
                            location_name,
                            ordered_qty,
                            park_error,
                        )
                        .await;
                    (idx, order_sku, outcome)
                }
            }))
            .buffer_unordered(self.config.max_concurrency)
            .collect()
            .await;

        let mut ordered = outcomes;
        ordered.sort_by_key(|(idx, _, _)| *idx);

        let mut resolution = BatchResolution::default();
        for (_, order_sku, outcome) in ordered {
            match outcome {
                Ok(result) => resolution.results.push(result),
                Err(error) => resolution.failures.push(LineFailure { order_sku, error }),
            }
        }

        debug!(
            resolved = resolution.results.len(),
            failed = resolution.failures.len(),
            "batch resolution complete"
        );
        Ok(resolution)
    }

    /// Supply validation for already-resolved stock SKUs.
    pub async fn validate_supply_batch(
        &self,
        stock_skus: &[SkuCode],
        location_id: Option<&LocationId>,
    ) -> SupplyBatchReport {
        self.supply.validate_batch(stock_skus, location_id).await
    }

    /// Apply guarded decrements per order line; partial-success report.
    pub async fn decrement_for_order(&self, lines: &[OrderLine]) -> DecrementReport {
        self.ledger.decrement_for_order(lines).await
    }

    /// Batched active-mapping lookup, keyed by order SKU. The one failure
    /// that makes the whole batch meaningless.
    async fn load_mappings(
        &self,
        order_skus: &[SkuCode],
    ) -> EngineResult<HashMap<SkuCode, SkuMapping>> {
        let mut unique = Vec::with_capacity(order_skus.len());
        let mut seen = HashSet::new();
        for order_sku in order_skus {
            if seen.insert(order_sku.clone()) {
                unique.push(order_sku.clone());
            }
        }

        let rows = self
            .store
            .find_active_mappings(&unique)
            .await
            .map_err(EngineError::storage)?;
        Ok(rows
            .into_iter()
            .map(|mapping| (mapping.order_sku.clone(), mapping))
            .collect())
    }

    /// Park placeholder mappings for order SKUs seen for the first time.
    ///
    /// Idempotent at the store level, and never blocks resolution: a
    /// failure is logged and surfaced as a diagnostic on the affected
    /// lines, which keep resolving as unmapped either way.
    async fn park_placeholders(
        &self,
        order_skus: &[SkuCode],
        mappings: &HashMap<SkuCode, SkuMapping>,
    ) -> HashMap<SkuCode, String> {
        let mut failures = HashMap::new();
        let mut seen = HashSet::new();
        for order_sku in order_skus {
            if mappings.contains_key(order_sku) || !seen.insert(order_sku.clone()) {
                continue;
            }
            if let Err(err) = self.store.upsert_mapping_placeholder(order_sku).await {
                warn!(order_sku = %order_sku, error = %err, "failed to park mapping placeholder");
                failures.insert(
                    order_sku.clone(),
                    format!("could not park mapping placeholder: {err}"),
                );
            }
        }
        failures
    }

    /// Status ladder for one order line: mapping, catalog registration,
    /// aggregate stock, composition presence, component sufficiency.
    async fn resolve_line(
        &self,
        order_sku: &SkuCode,
        mapping: Option<SkuMapping>,
        location_id: Option<&LocationId>,
        location_name: Option<String>,
        ordered_qty: i64,
        park_error: Option<String>,
    ) -> EngineResult<ResolutionResult> {
        let mut result =
            ResolutionResult::seed(order_sku.clone(), location_id.cloned(), location_name);
        if let Some(message) = park_error {
            result.diagnostics.push(message);
        }

        let Some(mapping) = mapping else {
            result.diagnostics.push(format!(
                "no active mapping for {order_sku}; placeholder parked for completion"
            ));
            return Ok(result);
        };

        result.mapped = true;
        result.stock_sku = mapping.stock_sku.clone();
        result.kit_sku = mapping.kit_sku.clone();
        result.unit_multiplier = Some(mapping.unit_multiplier);

        let Some(stock_sku) = mapping.target().cloned() else {
            result
                .diagnostics
                .push(format!("mapping for {order_sku} has no stock target assigned"));
            return Ok(result);
        };

        let ordered_units = mapping.stock_units_for(ordered_qty);
        result.fulfillment_status = self
            .fulfillment_for(&stock_sku, location_id, ordered_units, &mut result)
            .await?;

        // Supply is computed independently of the fulfillment outcome for
        // the same stock SKU.
        let supply = self.supply.validate(&stock_sku, location_id).await?;
        result.supply_status = supply.status;
        if let Some(message) = supply.diagnostic {
            result.diagnostics.push(message);
        }

        result.recombine();
        Ok(result)
    }

    async fn fulfillment_for(
        &self,
        stock_sku: &SkuCode,
        location_id: Option<&LocationId>,
        ordered_units: i64,
        result: &mut ResolutionResult,
    ) -> EngineResult<FulfillmentStatus> {
        let place = result
            .location_name
            .clone()
            .or_else(|| location_id.map(|l| l.as_str().to_string()));

        let item = self
            .store
            .find_stock_item(stock_sku)
            .await
            .map_err(|e| EngineError::storage_for(stock_sku.clone(), e))?;

        let item = match item {
            None => {
                result
                    .diagnostics
                    .push(format!("stock SKU {stock_sku} is not registered in the catalog"));
                return Ok(FulfillmentStatus::SkuNotRegistered);
            }
            Some(item) if !item.active => {
                result
                    .diagnostics
                    .push(format!("stock SKU {stock_sku} is inactive"));
                return Ok(FulfillmentStatus::SkuNotRegistered);
            }
            Some(item) => item,
        };

        if !item.has_aggregate_stock() {
            result
                .diagnostics
                .push(format!("no stock on hand for {stock_sku}"));
            return Ok(FulfillmentStatus::OutOfStock);
        }

        if !self.compositions.has_composition(stock_sku, location_id).await? {
            result.diagnostics.push(match &place {
                Some(place) => {
                    format!("no composition registered for {stock_sku} at {place}")
                }
                None => format!("no composition registered for {stock_sku}"),
            });
            return Ok(FulfillmentStatus::NoComposition);
        }

        let check = self
            .compositions
            .check_components(stock_sku, location_id, ordered_units)
            .await?;
        if !check.sufficient {
            for shortfall in &check.shortfalls {
                let place = place.as_deref().unwrap_or("all locations");
                result.diagnostics.push(format!(
                    "insufficient stock of component {} at {place}: required {}, available {}",
                    shortfall.component_sku, shortfall.required, shortfall.available
                ));
            }
            return Ok(FulfillmentStatus::OutOfStock);
        }

        if item.is_below_minimum() {
            result.diagnostics.push(format!(
                "stock for {stock_sku} is below minimum quantity ({} < {})",
                item.quantity_on_hand, item.minimum_quantity
            ));
        }

        Ok(FulfillmentStatus::ReadyToFulfill)
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
