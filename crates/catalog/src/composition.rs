use serde::{Deserialize, Serialize};

use stockwise_core::{LocationId, SkuCode};

/// One component line of a kit parent's bill of materials.
///
/// Compositions are scoped per location: the same parent can be a kit at
/// one location and have no recipe at another. A parent with zero rows at
/// a given location has *no composition there* — never a zero-cost kit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRequirement {
    pub parent_sku: SkuCode,
    pub component_sku: SkuCode,
    /// Component units consumed per parent unit.
    pub quantity_per_unit: i64,
    /// Location this row applies to; `None` for location-agnostic rows.
    pub location_id: Option<LocationId>,
}

impl ComponentRequirement {
    /// Component units needed to fulfill `ordered_units` of the parent.
    ///
    /// Saturating and clamped at zero: a pathological catalog row must
    /// never wrap into a passing availability check.
    pub fn required_for(&self, ordered_units: i64) -> i64 {
        self.quantity_per_unit
            .max(0)
            .saturating_mul(ordered_units.max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(quantity_per_unit: i64) -> ComponentRequirement {
        ComponentRequirement {
            parent_sku: SkuCode::new("KIT-1"),
            component_sku: SkuCode::new("PART-A"),
            quantity_per_unit,
            location_id: Some(LocationId::new("L1")),
        }
    }

    #[test]
    fn requirement_scales_with_ordered_units() {
        assert_eq!(row(2).required_for(3), 6);
        assert_eq!(row(1).required_for(1), 1);
    }

    #[test]
    fn dirty_rows_never_produce_negative_requirements() {
        assert_eq!(row(-4).required_for(3), 0);
        assert_eq!(row(2).required_for(-1), 0);
    }

    #[test]
    fn large_requirements_saturate_instead_of_wrapping() {
        assert_eq!(row(i64::MAX).required_for(2), i64::MAX);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Requirements are never negative, whatever the row holds.
            #[test]
            fn required_is_non_negative(qty in any::<i64>(), units in any::<i64>()) {
                prop_assert!(row(qty).required_for(units) >= 0);
            }

            /// More ordered units never require fewer components.
            #[test]
            fn required_is_monotone(qty in 0i64..1_000_000, a in 0i64..1_000_000, b in 0i64..1_000_000) {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                prop_assert!(row(qty).required_for(lo) <= row(qty).required_for(hi));
            }
        }
    }
}
