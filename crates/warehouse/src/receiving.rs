use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{DomainError, LocationId, QueueEntryId, SkuId, UserId};

use crate::movement::{MovementType, NewMovement};

/// Status of a receiving queue entry. PENDING is the only non-terminal
/// state; APPROVED and REJECTED are terminal and single-fire.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    Pending,
    Approved,
    Rejected,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "PENDING",
            QueueStatus::Approved => "APPROVED",
            QueueStatus::Rejected => "REJECTED",
        }
    }
}

impl core::str::FromStr for QueueStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(QueueStatus::Pending),
            "APPROVED" => Ok(QueueStatus::Approved),
            "REJECTED" => Ok(QueueStatus::Rejected),
            other => Err(DomainError::validation(format!("unknown queue status: {other}"))),
        }
    }
}

/// A receipt waiting to be staged into the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReceipt {
    pub sku_id: SkuId,
    pub quantity: i64,
    pub supplier_name: String,
    pub po_number: String,
    pub reference_note: String,
    pub received_by: UserId,
}

impl NewReceipt {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "receipt quantity must be positive, got {}",
                self.quantity
            )));
        }
        Ok(())
    }
}

/// A staged receiving queue entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: QueueEntryId,
    pub sku_id: SkuId,
    pub quantity: i64,
    pub supplier_name: String,
    pub po_number: String,
    pub reference_note: String,
    pub received_by: UserId,
    pub status: QueueStatus,
    pub created_at: DateTime<Utc>,
}

impl QueueEntry {
    /// Whether this entry can still transition (approval or rejection).
    pub fn is_pending(&self) -> bool {
        self.status == QueueStatus::Pending
    }

    /// The IN movement approval posts against the receiving dock, or `None`
    /// if the entry is no longer PENDING (the no-op idempotency guard).
    ///
    /// The movement's actor is the entry's `received_by`; its reference is
    /// the PO number when present, otherwise the free-text note.
    pub fn approval_movement(&self, receiving_dock: LocationId) -> Option<NewMovement> {
        if !self.is_pending() {
            return None;
        }
        let reference = if self.po_number.trim().is_empty() {
            self.reference_note.clone()
        } else {
            format!("PO {}", self.po_number)
        };
        Some(NewMovement {
            sku_id: self.sku_id,
            loc_id: receiving_dock,
            movement_type: MovementType::In,
            quantity_change: self.quantity,
            reference,
            user_id: self.received_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(status: QueueStatus) -> QueueEntry {
        QueueEntry {
            id: QueueEntryId::new(1),
            sku_id: SkuId::new(7),
            quantity: 25,
            supplier_name: "Acme".to_string(),
            po_number: "1009".to_string(),
            reference_note: "pallet 3".to_string(),
            received_by: UserId::new(4),
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn pending_entry_yields_one_in_movement() {
        let m = entry(QueueStatus::Pending)
            .approval_movement(LocationId::new(9))
            .unwrap();
        assert_eq!(m.movement_type, MovementType::In);
        assert_eq!(m.quantity_change, 25);
        assert_eq!(m.loc_id, LocationId::new(9));
        assert_eq!(m.user_id, UserId::new(4));
        assert_eq!(m.reference, "PO 1009");
        assert!(m.validate().is_ok());
    }

    #[test]
    fn terminal_entries_yield_nothing() {
        assert!(entry(QueueStatus::Approved).approval_movement(LocationId::new(9)).is_none());
        assert!(entry(QueueStatus::Rejected).approval_movement(LocationId::new(9)).is_none());
    }

    #[test]
    fn reference_falls_back_to_note_without_po() {
        let mut e = entry(QueueStatus::Pending);
        e.po_number = String::new();
        let m = e.approval_movement(LocationId::new(9)).unwrap();
        assert_eq!(m.reference, "pallet 3");
    }

    #[test]
    fn non_positive_receipts_are_rejected() {
        let receipt = NewReceipt {
            sku_id: SkuId::new(1),
            quantity: 0,
            supplier_name: String::new(),
            po_number: String::new(),
            reference_note: String::new(),
            received_by: UserId::new(1),
        };
        assert!(receipt.validate().is_err());
    }
}
