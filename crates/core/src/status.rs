//! Readiness status taxonomy and the combination policy.
//!
//! Three exhaustive enums cover the engine's user-facing states. Each enum
//! carries a fixed severity ordering (most blocking ranks highest), and
//! [`combine`] reduces a fulfillment/supply pair to the single status the
//! order-management UI consumes.

use serde::{Deserialize, Serialize};

/// Per-order-line fulfillment status, derived from mapping, catalog
/// registration, composition, and location stock.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentStatus {
    /// The mapped stock SKU is absent from the catalog, or inactive.
    SkuNotRegistered,
    /// Aggregate stock is gone, or the kit's components cannot cover the
    /// ordered quantity at the location.
    OutOfStock,
    /// No active mapping with a stock target exists for the order SKU.
    Unmapped,
    /// Stock exists but no composition is registered at the queried
    /// location. Distinct from [`Self::OutOfStock`]: the recipe is missing,
    /// not the stock.
    NoComposition,
    /// Every gate passed; the line can be fulfilled from the location.
    ReadyToFulfill,
}

impl FulfillmentStatus {
    /// Severity rank; greater is more blocking.
    pub fn severity(self) -> u8 {
        match self {
            Self::ReadyToFulfill => 0,
            Self::NoComposition => 1,
            Self::Unmapped => 2,
            Self::OutOfStock => 3,
            Self::SkuNotRegistered => 4,
        }
    }

    /// Stable machine-readable code (wire contract with the UI layer).
    pub fn as_code(self) -> &'static str {
        match self {
            Self::SkuNotRegistered => "SKU_NOT_REGISTERED",
            Self::OutOfStock => "OUT_OF_STOCK",
            Self::Unmapped => "UNMAPPED",
            Self::NoComposition => "NO_COMPOSITION",
            Self::ReadyToFulfill => "READY_TO_FULFILL",
        }
    }

    /// Downstream stock decrementing is only allowed for ready lines.
    pub fn allows_decrement(self) -> bool {
        self == Self::ReadyToFulfill
    }
}

impl core::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Per-stock-SKU supply (insumo) status.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplyStatus {
    /// An insumo referenced by the product is absent from the catalog.
    InsumoNotRegistered,
    /// A registered insumo has no unit available for this order line.
    InsumoPending,
    /// The product has no insumo requirements; a valid state, not a
    /// failure.
    NoInsumoMapping,
    /// Every required insumo has at least one unit on hand.
    Ready,
}

impl SupplyStatus {
    /// Severity rank; greater is more blocking.
    pub fn severity(self) -> u8 {
        match self {
            Self::Ready => 0,
            Self::NoInsumoMapping => 1,
            Self::InsumoPending => 2,
            Self::InsumoNotRegistered => 3,
        }
    }

    /// Stable machine-readable code (wire contract with the UI layer).
    pub fn as_code(self) -> &'static str {
        match self {
            Self::InsumoNotRegistered => "INSUMO_NOT_REGISTERED",
            Self::InsumoPending => "INSUMO_PENDING",
            Self::NoInsumoMapping => "NO_INSUMO_MAPPING",
            Self::Ready => "READY",
        }
    }

    pub fn is_blocking(self) -> bool {
        matches!(self, Self::InsumoNotRegistered | Self::InsumoPending)
    }
}

impl core::fmt::Display for SupplyStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_code())
    }
}

/// The single user-facing readiness status per order line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CombinedStatus {
    SkuNotRegistered,
    OutOfStock,
    Unmapped,
    NoComposition,
    ReadyToFulfill,
}

impl CombinedStatus {
    /// Severity rank; greater is more blocking.
    pub fn severity(self) -> u8 {
        match self {
            Self::ReadyToFulfill => 0,
            Self::NoComposition => 1,
            Self::Unmapped => 2,
            Self::OutOfStock => 3,
            Self::SkuNotRegistered => 4,
        }
    }

    /// Stable machine-readable code (wire contract with the UI layer).
    pub fn as_code(self) -> &'static str {
        match self {
            Self::SkuNotRegistered => "SKU_NOT_REGISTERED",
            Self::OutOfStock => "OUT_OF_STOCK",
            Self::Unmapped => "UNMAPPED",
            Self::NoComposition => "NO_COMPOSITION",
            Self::ReadyToFulfill => "READY_TO_FULFILL",
        }
    }
}

impl core::fmt::Display for CombinedStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Reduce a fulfillment/supply pair to one user-facing status.
///
/// Fixed precedence, most severe wins: registration failures first, then
/// stock shortfalls, then the fulfillment-only gates (unmapped order SKU,
/// missing composition), then ready. The rules are checked in order, so a
/// supply shortfall outranks an unmapped order SKU.
///
/// Stateless: every combination is recomputed fresh on each resolution
/// call.
pub fn combine(fulfillment: FulfillmentStatus, supply: SupplyStatus) -> CombinedStatus {
    use FulfillmentStatus as F;
    use SupplyStatus as S;

    if fulfillment == F::SkuNotRegistered || supply == S::InsumoNotRegistered {
        return CombinedStatus::SkuNotRegistered;
    }
    if fulfillment == F::OutOfStock || supply == S::InsumoPending {
        return CombinedStatus::OutOfStock;
    }
    match fulfillment {
        F::SkuNotRegistered => CombinedStatus::SkuNotRegistered,
        F::OutOfStock => CombinedStatus::OutOfStock,
        F::Unmapped => CombinedStatus::Unmapped,
        F::NoComposition => CombinedStatus::NoComposition,
        F::ReadyToFulfill => CombinedStatus::ReadyToFulfill,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_FULFILLMENT: [FulfillmentStatus; 5] = [
        FulfillmentStatus::SkuNotRegistered,
        FulfillmentStatus::OutOfStock,
        FulfillmentStatus::Unmapped,
        FulfillmentStatus::NoComposition,
        FulfillmentStatus::ReadyToFulfill,
    ];

    const ALL_SUPPLY: [SupplyStatus; 4] = [
        SupplyStatus::InsumoNotRegistered,
        SupplyStatus::InsumoPending,
        SupplyStatus::NoInsumoMapping,
        SupplyStatus::Ready,
    ];

    #[test]
    fn combine_registration_failures_dominate() {
        assert_eq!(
            combine(FulfillmentStatus::SkuNotRegistered, SupplyStatus::Ready),
            CombinedStatus::SkuNotRegistered
        );
        assert_eq!(
            combine(
                FulfillmentStatus::ReadyToFulfill,
                SupplyStatus::InsumoNotRegistered
            ),
            CombinedStatus::SkuNotRegistered
        );
    }

    #[test]
    fn combine_supply_shortfall_reads_as_out_of_stock() {
        assert_eq!(
            combine(FulfillmentStatus::ReadyToFulfill, SupplyStatus::InsumoPending),
            CombinedStatus::OutOfStock
        );
    }

    #[test]
    fn combine_fulfillment_only_gates_pass_through() {
        assert_eq!(
            combine(FulfillmentStatus::Unmapped, SupplyStatus::NoInsumoMapping),
            CombinedStatus::Unmapped
        );
        assert_eq!(
            combine(FulfillmentStatus::NoComposition, SupplyStatus::Ready),
            CombinedStatus::NoComposition
        );
    }

    #[test]
    fn combine_ready_requires_both_sides_clear() {
        assert_eq!(
            combine(FulfillmentStatus::ReadyToFulfill, SupplyStatus::Ready),
            CombinedStatus::ReadyToFulfill
        );
        assert_eq!(
            combine(
                FulfillmentStatus::ReadyToFulfill,
                SupplyStatus::NoInsumoMapping
            ),
            CombinedStatus::ReadyToFulfill
        );
    }

    #[test]
    fn combine_rule_order_puts_shortfalls_above_unmapped() {
        // Rule 2 outranks rule 3: a supply shortfall on an unmapped line
        // still reads as out of stock.
        assert_eq!(
            combine(FulfillmentStatus::Unmapped, SupplyStatus::InsumoPending),
            CombinedStatus::OutOfStock
        );
    }

    #[test]
    fn severity_ranks_are_distinct_per_enum() {
        let mut f: Vec<u8> = ALL_FULFILLMENT.iter().map(|s| s.severity()).collect();
        f.sort_unstable();
        f.dedup();
        assert_eq!(f.len(), ALL_FULFILLMENT.len());

        let mut s: Vec<u8> = ALL_SUPPLY.iter().map(|s| s.severity()).collect();
        s.sort_unstable();
        s.dedup();
        assert_eq!(s.len(), ALL_SUPPLY.len());
    }

    #[test]
    fn serde_codes_match_as_code() {
        for status in ALL_FULFILLMENT {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_code()));
        }
        for status in ALL_SUPPLY {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_code()));
        }
    }

    #[test]
    fn only_ready_allows_decrement() {
        for status in ALL_FULFILLMENT {
            assert_eq!(
                status.allows_decrement(),
                status == FulfillmentStatus::ReadyToFulfill
            );
        }
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_fulfillment() -> impl Strategy<Value = FulfillmentStatus> {
            proptest::sample::select(ALL_FULFILLMENT.to_vec())
        }

        fn any_supply() -> impl Strategy<Value = SupplyStatus> {
            proptest::sample::select(ALL_SUPPLY.to_vec())
        }

        proptest! {
            /// Ready output implies both inputs were non-blocking.
            #[test]
            fn ready_requires_clear_inputs(f in any_fulfillment(), s in any_supply()) {
                if combine(f, s) == CombinedStatus::ReadyToFulfill {
                    prop_assert_eq!(f, FulfillmentStatus::ReadyToFulfill);
                    prop_assert!(!s.is_blocking());
                }
            }

            /// The combined status is never less severe than what the
            /// supply side alone forces.
            #[test]
            fn supply_blocking_never_downgraded(f in any_fulfillment(), s in any_supply()) {
                let combined = combine(f, s);
                if s == SupplyStatus::InsumoNotRegistered {
                    prop_assert_eq!(combined, CombinedStatus::SkuNotRegistered);
                }
                if s == SupplyStatus::InsumoPending {
                    prop_assert!(combined.severity() >= CombinedStatus::OutOfStock.severity());
                }
            }

            /// Combination is deterministic and stateless.
            #[test]
            fn combine_is_deterministic(f in any_fulfillment(), s in any_supply()) {
                prop_assert_eq!(combine(f, s), combine(f, s));
            }
        }
    }
}
