use serde::{Deserialize, Serialize};

use stockwise_core::{LocationId, SkuCode};

/// Catalog stock keeping unit with its aggregate on-hand quantity.
///
/// Read-only to the engine except for the aggregate write-back after
/// decrements. The aggregate equals the sum of the SKU's per-location
/// quantities; it is maintained best-effort and never gates a decrement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    pub sku: SkuCode,
    pub active: bool,
    pub quantity_on_hand: i64,
    pub minimum_quantity: i64,
}

impl StockItem {
    pub fn has_aggregate_stock(&self) -> bool {
        self.quantity_on_hand > 0
    }

    /// Below the replenishment threshold set by catalog management.
    /// Informational only; never changes a readiness status.
    pub fn is_below_minimum(&self) -> bool {
        self.quantity_on_hand < self.minimum_quantity
    }
}

/// Physical or logical stock-holding place; the unit of stock partitioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLocation {
    pub id: LocationId,
    pub name: String,
}

/// Per-location quantity row for a SKU.
///
/// The quantity never goes negative; the storage layer's guarded update
/// enforces that under concurrency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationStockEntry {
    pub sku: SkuCode,
    pub location_id: LocationId,
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity_on_hand: i64, minimum_quantity: i64) -> StockItem {
        StockItem {
            sku: SkuCode::new("STK-1"),
            active: true,
            quantity_on_hand,
            minimum_quantity,
        }
    }

    #[test]
    fn aggregate_stock_requires_positive_quantity() {
        assert!(item(1, 0).has_aggregate_stock());
        assert!(!item(0, 0).has_aggregate_stock());
        assert!(!item(-3, 0).has_aggregate_stock());
    }

    #[test]
    fn below_minimum_compares_against_threshold() {
        assert!(item(2, 5).is_below_minimum());
        assert!(!item(5, 5).is_below_minimum());
    }
}
