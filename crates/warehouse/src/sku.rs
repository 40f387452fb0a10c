use serde::{Deserialize, Serialize};

use stockbook_core::{DomainError, SkuId};

/// Lifecycle status of a SKU record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkuStatus {
    Active,
    Inactive,
}

impl SkuStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkuStatus::Active => "ACTIVE",
            SkuStatus::Inactive => "INACTIVE",
        }
    }
}

impl core::str::FromStr for SkuStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(SkuStatus::Active),
            "INACTIVE" => Ok(SkuStatus::Inactive),
            other => Err(DomainError::validation(format!("unknown sku status: {other}"))),
        }
    }
}

/// A stock-keeping unit. `sku_num` is the unique business key; `id` is the
/// surrogate key movements reference. Immutable once referenced by movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sku {
    pub id: SkuId,
    pub sku_num: String,
    pub description: String,
    pub status: SkuStatus,
}

/// Validate a SKU business key: non-empty after trimming.
pub fn validate_sku_num(sku_num: &str) -> Result<(), DomainError> {
    if sku_num.trim().is_empty() {
        return Err(DomainError::validation("sku_num cannot be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sku_num_is_rejected() {
        assert!(validate_sku_num("  ").is_err());
        assert!(validate_sku_num("A1").is_ok());
    }

    #[test]
    fn status_round_trips_through_str() {
        assert_eq!("ACTIVE".parse::<SkuStatus>().unwrap(), SkuStatus::Active);
        assert_eq!(SkuStatus::Inactive.as_str(), "INACTIVE");
        assert!("RETIRED".parse::<SkuStatus>().is_err());
    }
}
