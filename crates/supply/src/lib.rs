//! Per-order supply ("insumo") validation.
//!
//! Insumos are auxiliary consumables (labels, packaging) tied to a
//! product and consumed exactly once per order line, independent of the
//! ordered quantity. This crate validates their availability per resolved
//! stock SKU; nothing here ever scales a requirement by ordered units.

pub mod validator;

pub use validator::{
    InsumoShortfall, SupplyBatchReport, SupplyFailure, SupplyValidation, SupplyValidator,
};
