use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockwise_core::{MappingId, SkuCode};

/// Stored correspondence between an order-side SKU and the internal
/// catalog.
///
/// Order SKUs arrive as opaque channel strings. An unseen order SKU gets a
/// placeholder row (no targets) the first time it is observed, parked for a
/// human to complete; only `active` rows participate in resolution, and
/// `order_sku` is unique among them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuMapping {
    pub id: MappingId,
    pub order_sku: SkuCode,
    /// Directly stocked item this order SKU sells.
    pub stock_sku: Option<SkuCode>,
    /// Kit parent this order SKU sells, when it maps to a kit rather than
    /// a directly stocked item.
    pub kit_sku: Option<SkuCode>,
    /// Stock units consumed per ordered unit (channel pack size).
    pub unit_multiplier: i64,
    pub active: bool,
    /// True when the row was parked automatically on first sight.
    pub auto_detected: bool,
    pub created_at: DateTime<Utc>,
}

impl SkuMapping {
    /// Placeholder row for an order SKU seen for the first time.
    ///
    /// Targets stay empty until catalog management completes the row; the
    /// order SKU keeps resolving as unmapped in the meantime.
    pub fn placeholder(order_sku: SkuCode) -> Self {
        Self {
            id: MappingId::new(),
            order_sku,
            stock_sku: None,
            kit_sku: None,
            unit_multiplier: 1,
            active: true,
            auto_detected: true,
            created_at: Utc::now(),
        }
    }

    /// The stock SKU this mapping resolves to, if any.
    ///
    /// A kit parent is itself a stock SKU in the composition catalog, so a
    /// kit-only mapping still has a target and the downstream status ladder
    /// is identical for both shapes.
    pub fn target(&self) -> Option<&SkuCode> {
        self.stock_sku.as_ref().or(self.kit_sku.as_ref())
    }

    pub fn is_resolved(&self) -> bool {
        self.target().is_some()
    }

    /// Stock units required for `ordered_qty` order units.
    ///
    /// Saturating, and resilient to dirty rows: a zero or negative
    /// multiplier behaves as 1 rather than erasing the requirement.
    pub fn stock_units_for(&self, ordered_qty: i64) -> i64 {
        self.unit_multiplier
            .max(1)
            .saturating_mul(ordered_qty.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_active_auto_detected_and_unresolved() {
        let mapping = SkuMapping::placeholder(SkuCode::new("CH-1"));
        assert!(mapping.active);
        assert!(mapping.auto_detected);
        assert!(!mapping.is_resolved());
        assert_eq!(mapping.unit_multiplier, 1);
        assert_eq!(mapping.target(), None);
    }

    #[test]
    fn target_prefers_stock_sku_over_kit_sku() {
        let mut mapping = SkuMapping::placeholder(SkuCode::new("CH-1"));
        mapping.kit_sku = Some(SkuCode::new("KIT-1"));
        assert_eq!(mapping.target(), Some(&SkuCode::new("KIT-1")));

        mapping.stock_sku = Some(SkuCode::new("STK-1"));
        assert_eq!(mapping.target(), Some(&SkuCode::new("STK-1")));
    }

    #[test]
    fn stock_units_scale_with_multiplier() {
        let mut mapping = SkuMapping::placeholder(SkuCode::new("CH-3PACK"));
        mapping.unit_multiplier = 3;
        assert_eq!(mapping.stock_units_for(2), 6);
    }

    #[test]
    fn stock_units_tolerate_dirty_rows() {
        let mut mapping = SkuMapping::placeholder(SkuCode::new("CH-1"));
        mapping.unit_multiplier = 0;
        assert_eq!(mapping.stock_units_for(2), 2);
        assert_eq!(mapping.stock_units_for(0), 1);
    }
}
