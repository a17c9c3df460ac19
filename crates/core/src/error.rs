//! Engine error model.

use thiserror::Error;

use crate::id::{LocationId, SkuCode};

/// Result type used across the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine-level error.
///
/// Expected business states (unmapped order SKUs, missing compositions,
/// products without insumos) are **not** errors; they are statuses (see
/// [`crate::status`]). This enum covers the failures that actually stop an
/// operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A value failed validation (e.g. a non-positive decrement quantity).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. a blank SKU code).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A guarded decrement found less stock than requested.
    ///
    /// Not retryable without re-reading the location quantity.
    #[error(
        "insufficient stock at location {location_id} for {sku}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        sku: SkuCode,
        location_id: LocationId,
        requested: i64,
        available: i64,
    },

    /// A storage collaborator failed; carries the SKU being worked on when
    /// one is known.
    #[error("storage failure ({}): {message}", .sku.as_ref().map(SkuCode::as_str).unwrap_or("batch"))]
    Storage {
        sku: Option<SkuCode>,
        message: String,
    },
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn insufficient_stock(
        sku: SkuCode,
        location_id: LocationId,
        requested: i64,
        available: i64,
    ) -> Self {
        Self::InsufficientStock {
            sku,
            location_id,
            requested,
            available,
        }
    }

    /// Storage failure not attributable to a single SKU (batch-level).
    pub fn storage(err: impl core::fmt::Display) -> Self {
        Self::Storage {
            sku: None,
            message: err.to_string(),
        }
    }

    /// Storage failure while working on a specific SKU.
    pub fn storage_for(sku: SkuCode, err: impl core::fmt::Display) -> Self {
        Self::Storage {
            sku: Some(sku),
            message: err.to_string(),
        }
    }

    pub fn is_insufficient_stock(&self) -> bool {
        matches!(self, Self::InsufficientStock { .. })
    }
}
