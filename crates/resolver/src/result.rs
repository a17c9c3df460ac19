use serde::Serialize;

use stockwise_core::{
    CombinedStatus, EngineError, FulfillmentStatus, LocationId, SkuCode, SupplyStatus, combine,
};

/// Per-order-line resolution outcome, consumed by the order-management UI
/// layer verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    pub order_sku: SkuCode,
    pub mapped: bool,
    pub stock_sku: Option<SkuCode>,
    pub kit_sku: Option<SkuCode>,
    pub unit_multiplier: Option<i64>,
    pub fulfillment_status: FulfillmentStatus,
    pub supply_status: SupplyStatus,
    pub combined_status: CombinedStatus,
    pub location_id: Option<LocationId>,
    pub location_name: Option<String>,
    /// Display-ready messages explaining non-ready statuses.
    pub diagnostics: Vec<String>,
}

impl ResolutionResult {
    /// Seed result for a line before any gate has passed: unmapped, with
    /// no supply requirements known.
    pub(crate) fn seed(
        order_sku: SkuCode,
        location_id: Option<LocationId>,
        location_name: Option<String>,
    ) -> Self {
        Self {
            order_sku,
            mapped: false,
            stock_sku: None,
            kit_sku: None,
            unit_multiplier: None,
            fulfillment_status: FulfillmentStatus::Unmapped,
            supply_status: SupplyStatus::NoInsumoMapping,
            combined_status: combine(FulfillmentStatus::Unmapped, SupplyStatus::NoInsumoMapping),
            location_id,
            location_name,
            diagnostics: Vec::new(),
        }
    }

    /// Recompute the combined status from the current pair.
    pub(crate) fn recombine(&mut self) {
        self.combined_status = combine(self.fulfillment_status, self.supply_status);
    }
}

/// A line whose resolution failed outright, with the offending SKU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFailure {
    pub order_sku: SkuCode,
    pub error: EngineError,
}

/// Batch resolution report.
///
/// `results` keeps input order (minus failed lines); `failures` isolates
/// per-line storage errors so sibling lines still resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResolution {
    pub results: Vec<ResolutionResult>,
    pub failures: Vec<LineFailure>,
}

impl BatchResolution {
    /// Lines cleared for downstream stock decrementing.
    pub fn ready_lines(&self) -> impl Iterator<Item = &ResolutionResult> {
        self.results
            .iter()
            .filter(|r| r.combined_status == CombinedStatus::ReadyToFulfill)
    }
}
