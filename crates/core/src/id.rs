//! Strongly-typed identifiers used across the engine.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

/// A stock keeping unit code, unique within an organization.
///
/// The same type carries order-side codes (as received from a sales
/// channel), internal stock codes, and insumo codes; the mapping catalog is
/// what relates the three populations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkuCode(String);

/// Identifier of a stock location (physical or logical stock partition).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(String);

macro_rules! impl_code_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Wrap a raw code without validation.
            ///
            /// Prefer `parse` at trust boundaries; `new` is for values
            /// already known to be well-formed (e.g. read back from storage).
            pub fn new(code: impl Into<String>) -> Self {
                Self(code.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<&str> for $t {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $t {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl FromStr for $t {
            type Err = EngineError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(EngineError::invalid_id(concat!($name, " cannot be blank")));
                }
                Ok(Self(trimmed.to_string()))
            }
        }
    };
}

impl_code_newtype!(SkuCode, "SkuCode");
impl_code_newtype!(LocationId, "LocationId");

/// Identifier of a stored SKU mapping row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingId(Uuid);

impl MappingId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
    /// for determinism.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MappingId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for MappingId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sku_code_parse_rejects_blank() {
        assert!("".parse::<SkuCode>().is_err());
        assert!("   ".parse::<SkuCode>().is_err());
    }

    #[test]
    fn sku_code_parse_trims() {
        let sku: SkuCode = "  ABC-1 ".parse().unwrap();
        assert_eq!(sku.as_str(), "ABC-1");
    }

    #[test]
    fn location_id_roundtrips_through_serde() {
        let loc = LocationId::new("L1");
        let json = serde_json::to_string(&loc).unwrap();
        assert_eq!(json, "\"L1\"");
        let back: LocationId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, loc);
    }
}
