//! Strongly-typed identifiers used across the domain.
//!
//! Every identifier is a surrogate numeric id assigned by storage. Distinct
//! newtypes keep a SKU id from being passed where a location id is expected,
//! which plain `i64` columns would happily allow.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a SKU record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkuId(i64);

/// Identifier of a bin location.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(i64);

/// Identifier of a ledger movement.
///
/// Also the tie-break for movements sharing a timestamp: ids are assigned in
/// append order, so ascending id is ascending ledger order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementId(i64);

/// Identifier of a receiving queue entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueEntryId(i64);

/// Identifier of a user (actor identity, assigned by the host system).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

macro_rules! impl_i64_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let id = i64::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(id))
            }
        }
    };
}

impl_i64_newtype!(SkuId, "SkuId");
impl_i64_newtype!(LocationId, "LocationId");
impl_i64_newtype!(MovementId, "MovementId");
impl_i64_newtype!(QueueEntryId, "QueueEntryId");
impl_i64_newtype!(UserId, "UserId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_from_string() {
        let id: SkuId = "42".parse().unwrap();
        assert_eq!(id, SkuId::new(42));
    }

    #[test]
    fn rejects_non_numeric() {
        let err = "abc".parse::<MovementId>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(_)));
    }

    #[test]
    fn ascending_ids_order_ascending() {
        assert!(MovementId::new(5) < MovementId::new(7));
    }
}
