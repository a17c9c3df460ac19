//! `stockwise-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure
//! concerns): typed identifiers, the engine error model, and the readiness
//! status taxonomy with its combination policy.

pub mod error;
pub mod id;
pub mod status;

pub use error::{EngineError, EngineResult};
pub use id::{LocationId, MappingId, SkuCode};
pub use status::{CombinedStatus, FulfillmentStatus, SupplyStatus, combine};
