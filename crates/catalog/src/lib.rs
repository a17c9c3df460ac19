//! Catalog data model: the rows the resolution engine reads and writes.
//!
//! Plain state structs, no I/O. Predicates that depend only on a row's own
//! fields live here; everything that needs storage lives in the ledger,
//! supply, and resolver crates.

pub mod composition;
pub mod insumo;
pub mod mapping;
pub mod stock;

pub use composition::ComponentRequirement;
pub use insumo::InsumoRequirement;
pub use mapping::SkuMapping;
pub use stock::{LocationStockEntry, StockItem, StockLocation};
