//! Per-location stock ledger.
//!
//! Answers "is there enough of SKU X at location L?" and performs guarded
//! decrements. Only the location-scoped quantity ever gates a decrement;
//! the aggregate on-hand quantity is recomputed afterwards as a
//! best-effort write-back.

pub mod ledger;

pub use ledger::{
    AvailabilityCheck, BatchAvailability, DecrementReport, FailedLine, OrderLine,
    StockLocationLedger, StockMutation, StockRequirement,
};
