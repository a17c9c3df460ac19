use serde::{Deserialize, Serialize};

use stockwise_core::SkuCode;

/// Auxiliary consumable (label, packaging) tied to a product.
///
/// An insumo is consumed once per order line containing the product,
/// regardless of the ordered quantity. That per-line semantics is the
/// defining rule of supply validation; nothing in this type scales with
/// units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsumoRequirement {
    pub product_sku: SkuCode,
    pub insumo_sku: SkuCode,
    /// Units consumed per order line; conventionally 1.
    pub quantity: i64,
    pub active: bool,
}

impl InsumoRequirement {
    /// Units required for one order line.
    ///
    /// Dirty rows (zero or negative quantity) still demand a single unit
    /// rather than silently passing.
    pub fn required_per_line(&self) -> i64 {
        self.quantity.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(quantity: i64) -> InsumoRequirement {
        InsumoRequirement {
            product_sku: SkuCode::new("PROD-1"),
            insumo_sku: SkuCode::new("LABEL-1"),
            quantity,
            active: true,
        }
    }

    #[test]
    fn conventional_rows_require_one_unit() {
        assert_eq!(row(1).required_per_line(), 1);
    }

    #[test]
    fn dirty_rows_still_require_one_unit() {
        assert_eq!(row(0).required_per_line(), 1);
        assert_eq!(row(-2).required_per_line(), 1);
    }

    #[test]
    fn explicit_multi_unit_rows_are_honored() {
        assert_eq!(row(2).required_per_line(), 2);
    }
}
