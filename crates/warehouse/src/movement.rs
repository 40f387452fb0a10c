use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{DomainError, LocationId, MovementId, SkuId, UserId};

/// Kind of ledger movement, with the sign convention of the balance fold.
///
/// `quantity_change` is stored as a non-negative magnitude for IN/OUT and as
/// a signed value for ADJUSTMENT; [`MovementType::signed`] applies the sign.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    In,
    Out,
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
            MovementType::Adjustment => "ADJUSTMENT",
        }
    }

    /// Signed delta contributed to the balance: IN and ADJUSTMENT add the
    /// stored quantity (already signed for ADJUSTMENT), OUT subtracts it.
    pub fn signed(&self, quantity_change: i64) -> i64 {
        match self {
            MovementType::In | MovementType::Adjustment => quantity_change,
            MovementType::Out => -quantity_change,
        }
    }
}

impl core::str::FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" => Ok(MovementType::In),
            "OUT" => Ok(MovementType::Out),
            "ADJUSTMENT" => Ok(MovementType::Adjustment),
            other => Err(DomainError::validation(format!(
                "unknown movement type: {other}"
            ))),
        }
    }
}

/// A movement not yet appended to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    pub sku_id: SkuId,
    pub loc_id: LocationId,
    pub movement_type: MovementType,
    pub quantity_change: i64,
    pub reference: String,
    pub user_id: UserId,
}

impl NewMovement {
    /// Validate the quantity direction for the movement type.
    ///
    /// IN/OUT carry a positive magnitude; an ADJUSTMENT is signed but a zero
    /// adjustment corrects nothing and is rejected.
    pub fn validate(&self) -> Result<(), DomainError> {
        match self.movement_type {
            MovementType::In | MovementType::Out => {
                if self.quantity_change <= 0 {
                    return Err(DomainError::validation(format!(
                        "{} movement requires a positive quantity_change, got {}",
                        self.movement_type.as_str(),
                        self.quantity_change
                    )));
                }
            }
            MovementType::Adjustment => {
                if self.quantity_change == 0 {
                    return Err(DomainError::validation(
                        "ADJUSTMENT movement cannot have zero quantity_change",
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn signed_delta(&self) -> i64 {
        self.movement_type.signed(self.quantity_change)
    }
}

/// A movement appended to the ledger. Immutable: corrections are new
/// ADJUSTMENT entries, never updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub sku_id: SkuId,
    pub loc_id: LocationId,
    pub movement_type: MovementType,
    pub quantity_change: i64,
    pub reference: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Movement {
    pub fn signed_delta(&self) -> i64 {
        self.movement_type.signed(self.quantity_change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movement(ty: MovementType, qty: i64) -> NewMovement {
        NewMovement {
            sku_id: SkuId::new(1),
            loc_id: LocationId::new(1),
            movement_type: ty,
            quantity_change: qty,
            reference: String::new(),
            user_id: UserId::new(1),
        }
    }

    #[test]
    fn sign_convention() {
        assert_eq!(MovementType::In.signed(5), 5);
        assert_eq!(MovementType::Out.signed(5), -5);
        assert_eq!(MovementType::Adjustment.signed(-3), -3);
        assert_eq!(MovementType::Adjustment.signed(4), 4);
    }

    #[test]
    fn in_and_out_require_positive_magnitude() {
        assert!(movement(MovementType::In, 5).validate().is_ok());
        assert!(movement(MovementType::In, 0).validate().is_err());
        assert!(movement(MovementType::Out, -2).validate().is_err());
    }

    #[test]
    fn adjustment_is_signed_but_never_zero() {
        assert!(movement(MovementType::Adjustment, -7).validate().is_ok());
        assert!(movement(MovementType::Adjustment, 0).validate().is_err());
    }

    #[test]
    fn type_round_trips_through_str() {
        for ty in [MovementType::In, MovementType::Out, MovementType::Adjustment] {
            assert_eq!(ty.as_str().parse::<MovementType>().unwrap(), ty);
        }
        assert!("TRANSFER".parse::<MovementType>().is_err());
    }
}
