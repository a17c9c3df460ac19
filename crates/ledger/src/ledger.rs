use serde::Serialize;
use tracing::{instrument, warn};

use stockwise_core::{EngineError, EngineResult, LocationId, SkuCode};
use stockwise_storage::EngineStore;

/// Outcome of a single availability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityCheck {
    pub sku: SkuCode,
    pub location_id: LocationId,
    pub required: i64,
    pub on_hand: i64,
    pub available: bool,
    pub location_name: Option<String>,
    /// Display-ready message when the item is not available.
    pub diagnostic: Option<String>,
}

impl AvailabilityCheck {
    fn evaluate(
        sku: SkuCode,
        location_id: LocationId,
        required: i64,
        on_hand: i64,
        location_name: Option<String>,
    ) -> Self {
        let available = on_hand >= required;
        let diagnostic = (!available).then(|| {
            let place = location_name.as_deref().unwrap_or(location_id.as_str());
            format!("insufficient stock at {place}: required {required}, available {on_hand}")
        });
        Self {
            sku,
            location_id,
            required,
            on_hand,
            available,
            location_name,
            diagnostic,
        }
    }

    fn failed(
        sku: SkuCode,
        location_id: LocationId,
        required: i64,
        location_name: Option<String>,
        message: String,
    ) -> Self {
        Self {
            sku,
            location_id,
            required,
            on_hand: 0,
            available: false,
            location_name,
            diagnostic: Some(message),
        }
    }
}

/// Requirement line for batch availability checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockRequirement {
    pub sku: SkuCode,
    pub quantity: i64,
}

/// Aggregated result of a batch availability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchAvailability {
    pub all_available: bool,
    pub checks: Vec<AvailabilityCheck>,
}

impl BatchAvailability {
    /// Multi-line `sku: message` report covering every shortfall; `None`
    /// when everything is available. Suitable for direct display.
    pub fn shortfall_report(&self) -> Option<String> {
        let lines: Vec<String> = self
            .checks
            .iter()
            .filter(|c| !c.available)
            .map(|c| {
                let message = c.diagnostic.as_deref().unwrap_or("unavailable");
                format!("{}: {}", c.sku, message)
            })
            .collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

/// Result of a successful stock mutation (decrement or restock).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockMutation {
    pub sku: SkuCode,
    pub location_id: LocationId,
    pub new_location_quantity: i64,
    /// Recomputed aggregate; `None` when the best-effort write-back
    /// failed (the mutation itself still happened).
    pub new_aggregate_quantity: Option<i64>,
}

/// Order line to decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub sku: SkuCode,
    pub location_id: LocationId,
    pub quantity: i64,
}

/// A line that could not be decremented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedLine {
    pub sku: SkuCode,
    pub location_id: LocationId,
    pub reason: String,
}

/// Partial-success report for an order's decrements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecrementReport {
    pub succeeded: Vec<StockMutation>,
    pub failed: Vec<FailedLine>,
}

impl DecrementReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Per-location quantity store operations.
#[derive(Debug, Clone)]
pub struct StockLocationLedger<S> {
    store: S,
}

impl<S: EngineStore> StockLocationLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Quantity of `sku` at the location; `0` when not stocked there.
    pub async fn on_hand(&self, sku: &SkuCode, location_id: &LocationId) -> EngineResult<i64> {
        Ok(self
            .store
            .find_location_stock(sku, location_id)
            .await
            .map_err(|e| EngineError::storage_for(sku.clone(), e))?
            .unwrap_or(0))
    }

    /// Is there at least `required` of `sku` at `location_id`?
    ///
    /// A SKU with no entry at the location reports unavailable with zero
    /// on hand; that is a normal "not stocked here" answer, not an error.
    pub async fn check_availability(
        &self,
        sku: &SkuCode,
        location_id: &LocationId,
        required: i64,
    ) -> EngineResult<AvailabilityCheck> {
        let location_name = self.location_name(location_id).await;
        let on_hand = self.on_hand(sku, location_id).await?;
        Ok(AvailabilityCheck::evaluate(
            sku.clone(),
            location_id.clone(),
            required,
            on_hand,
            location_name,
        ))
    }

    /// Availability of several SKUs at one location.
    ///
    /// Per-item storage failures are captured in that item's diagnostic
    /// and never abort sibling items.
    pub async fn check_availability_batch(
        &self,
        items: &[StockRequirement],
        location_id: &LocationId,
    ) -> EngineResult<BatchAvailability> {
        let location_name = self.location_name(location_id).await;

        let mut checks = Vec::with_capacity(items.len());
        for item in items {
            match self.store.find_location_stock(&item.sku, location_id).await {
                Ok(found) => checks.push(AvailabilityCheck::evaluate(
                    item.sku.clone(),
                    location_id.clone(),
                    item.quantity,
                    found.unwrap_or(0),
                    location_name.clone(),
                )),
                Err(err) => checks.push(AvailabilityCheck::failed(
                    item.sku.clone(),
                    location_id.clone(),
                    item.quantity,
                    location_name.clone(),
                    err.to_string(),
                )),
            }
        }

        let all_available = checks.iter().all(|c| c.available);
        Ok(BatchAvailability {
            all_available,
            checks,
        })
    }

    /// Decrement `qty` units of `sku` at `location_id`.
    ///
    /// The location entry is the only gate: the guarded store update
    /// either applies fully or this fails with
    /// [`EngineError::InsufficientStock`]. The aggregate on-hand quantity
    /// is then re-summed across locations and written back.
    #[instrument(skip(self), fields(sku = %sku, location = %location_id, qty))]
    pub async fn decrement(
        &self,
        sku: &SkuCode,
        location_id: &LocationId,
        qty: i64,
    ) -> EngineResult<StockMutation> {
        if qty <= 0 {
            return Err(EngineError::validation(format!(
                "decrement quantity must be positive, got {qty}"
            )));
        }

        let applied = self
            .store
            .try_decrement_location_stock(sku, location_id, qty)
            .await
            .map_err(|e| EngineError::storage_for(sku.clone(), e))?;

        let new_location_quantity = match applied {
            Some(quantity) => quantity,
            None => {
                let available = self.on_hand(sku, location_id).await?;
                return Err(EngineError::insufficient_stock(
                    sku.clone(),
                    location_id.clone(),
                    qty,
                    available,
                ));
            }
        };

        let new_aggregate_quantity = self.write_back_aggregate(sku).await;
        Ok(StockMutation {
            sku: sku.clone(),
            location_id: location_id.clone(),
            new_location_quantity,
            new_aggregate_quantity,
        })
    }

    /// Add `qty` units of `sku` at `location_id` (returns, corrections).
    #[instrument(skip(self), fields(sku = %sku, location = %location_id, qty))]
    pub async fn restock(
        &self,
        sku: &SkuCode,
        location_id: &LocationId,
        qty: i64,
    ) -> EngineResult<StockMutation> {
        if qty <= 0 {
            return Err(EngineError::validation(format!(
                "restock quantity must be positive, got {qty}"
            )));
        }

        let new_location_quantity = self
            .store
            .increment_location_stock(sku, location_id, qty)
            .await
            .map_err(|e| EngineError::storage_for(sku.clone(), e))?;

        let new_aggregate_quantity = self.write_back_aggregate(sku).await;
        Ok(StockMutation {
            sku: sku.clone(),
            location_id: location_id.clone(),
            new_location_quantity,
            new_aggregate_quantity,
        })
    }

    /// Apply decrements per order line, continuing past individual
    /// failures; callers get a partial-success report, never an abort.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn decrement_for_order(&self, lines: &[OrderLine]) -> DecrementReport {
        let mut report = DecrementReport::default();
        for line in lines {
            match self.decrement(&line.sku, &line.location_id, line.quantity).await {
                Ok(outcome) => report.succeeded.push(outcome),
                Err(err) => report.failed.push(FailedLine {
                    sku: line.sku.clone(),
                    location_id: line.location_id.clone(),
                    reason: err.to_string(),
                }),
            }
        }
        report
    }

    /// Re-sum all locations and persist the aggregate.
    ///
    /// Best effort: a failure is logged and reported as `None`, and never
    /// unwinds the mutation that triggered it. The value tolerates
    /// transient staleness under concurrent multi-location mutations.
    async fn write_back_aggregate(&self, sku: &SkuCode) -> Option<i64> {
        let sum = match self.store.sum_location_stock(sku).await {
            Ok(sum) => sum,
            Err(err) => {
                warn!(sku = %sku, error = %err, "aggregate re-sum failed after mutation");
                return None;
            }
        };
        if let Err(err) = self.store.update_item_quantity(sku, sum).await {
            warn!(sku = %sku, error = %err, "aggregate write-back failed after mutation");
            return None;
        }
        Some(sum)
    }

    async fn location_name(&self, location_id: &LocationId) -> Option<String> {
        match self.store.find_location(location_id).await {
            Ok(found) => found.map(|l| l.name),
            Err(err) => {
                // Traceability metadata only; degrade instead of failing
                // the check that asked for it.
                warn!(location = %location_id, error = %err, "location lookup failed");
                None
            }
        }
    }
}
