//! In-memory ledger store.
//!
//! Intended for tests/dev. Balances are derived through the same
//! `stockbook-warehouse` folds the fallback strategy uses, so the persistent
//! and in-memory implementations share one definition of "balance".

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use stockbook_core::{DomainError, LocationId, MovementId, QueueEntryId, SkuId};
use stockbook_warehouse::{
    Location, Movement, NewMovement, NewReceipt, Page, QueueEntry, QueueStatus, RunningBalances,
    Sku, SkuStatus, fold_balances, validate_location_parts, validate_sku_num,
};

use super::{BalancePage, BalanceRow, DetailRow, DetailStrategy, LedgerStore, StoreError};
use async_trait::async_trait;

#[derive(Debug, Default)]
struct Tables {
    skus: HashMap<SkuId, Sku>,
    locations: HashMap<LocationId, Location>,
    movements: Vec<Movement>,
    inventory: HashMap<(SkuId, LocationId), i64>,
    queue: HashMap<QueueEntryId, QueueEntry>,
    next_sku_id: i64,
    next_location_id: i64,
    next_movement_id: i64,
    next_queue_id: i64,
}

/// In-memory twin of the Postgres store.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    tables: RwLock<Tables>,
}

/// Literal, case-insensitive substring match: the in-memory equivalent of
/// the escaped ILIKE filter.
fn matches_filter(sku_num: &str, filter: &str) -> bool {
    sku_num.to_lowercase().contains(&filter.to_lowercase())
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append with an injected timestamp. Test/dev helper for deterministic
    /// timestamp-tie scenarios; the trait's `append_movement` stamps now().
    pub fn append_movement_at(
        &self,
        movement: &NewMovement,
        at: DateTime<Utc>,
    ) -> Result<MovementId, StoreError> {
        let mut tables = self.write()?;
        Self::append_locked(&mut tables, movement, at)
    }

    /// Number of movements in the ledger (test helper).
    pub fn movement_count(&self) -> usize {
        self.tables.read().map(|t| t.movements.len()).unwrap_or(0)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::storage("lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::storage("lock poisoned"))
    }

    fn append_locked(
        tables: &mut Tables,
        movement: &NewMovement,
        at: DateTime<Utc>,
    ) -> Result<MovementId, StoreError> {
        movement.validate()?;
        if !tables.skus.contains_key(&movement.sku_id) {
            return Err(DomainError::validation(format!(
                "sku_id {} does not reference an existing SKU",
                movement.sku_id
            ))
            .into());
        }
        if !tables.locations.contains_key(&movement.loc_id) {
            return Err(DomainError::validation(format!(
                "loc_id {} does not reference an existing location",
                movement.loc_id
            ))
            .into());
        }

        let key = (movement.sku_id, movement.loc_id);
        let current = tables.inventory.get(&key).copied().unwrap_or(0);
        let next = current + movement.signed_delta();
        if next < 0 {
            return Err(DomainError::conflict(format!(
                "movement would drive balance negative ({current} -> {next})"
            ))
            .into());
        }

        tables.next_movement_id += 1;
        let id = MovementId::new(tables.next_movement_id);
        tables.movements.push(Movement {
            id,
            sku_id: movement.sku_id,
            loc_id: movement.loc_id,
            movement_type: movement.movement_type,
            quantity_change: movement.quantity_change,
            reference: movement.reference.clone(),
            user_id: movement.user_id,
            created_at: at,
        });
        tables.inventory.insert(key, next);
        Ok(id)
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn create_sku(&self, sku_num: &str, description: &str) -> Result<SkuId, StoreError> {
        validate_sku_num(sku_num)?;
        let mut tables = self.write()?;
        if tables.skus.values().any(|s| s.sku_num == sku_num) {
            return Err(DomainError::conflict(format!("duplicate sku_num: {sku_num}")).into());
        }
        tables.next_sku_id += 1;
        let id = SkuId::new(tables.next_sku_id);
        tables.skus.insert(
            id,
            Sku {
                id,
                sku_num: sku_num.to_string(),
                description: description.to_string(),
                status: SkuStatus::Active,
            },
        );
        Ok(id)
    }

    async fn create_location(
        &self,
        row_code: &str,
        bay_num: &str,
        level_code: &str,
        side: &str,
    ) -> Result<LocationId, StoreError> {
        validate_location_parts(row_code, bay_num, level_code, side)?;
        let mut tables = self.write()?;
        let duplicate = tables.locations.values().any(|l| {
            l.row_code == row_code
                && l.bay_num == bay_num
                && l.level_code == level_code
                && l.side == side
        });
        if duplicate {
            return Err(DomainError::conflict(format!(
                "duplicate location: {row_code}-{bay_num}-{level_code}-{side}"
            ))
            .into());
        }
        tables.next_location_id += 1;
        let id = LocationId::new(tables.next_location_id);
        tables.locations.insert(
            id,
            Location {
                id,
                row_code: row_code.to_string(),
                bay_num: bay_num.to_string(),
                level_code: level_code.to_string(),
                side: side.to_string(),
            },
        );
        Ok(id)
    }

    async fn get_sku(&self, id: SkuId) -> Result<Option<Sku>, StoreError> {
        Ok(self.read()?.skus.get(&id).cloned())
    }

    async fn find_sku(&self, sku_num: &str) -> Result<Option<Sku>, StoreError> {
        Ok(self
            .read()?
            .skus
            .values()
            .find(|s| s.sku_num == sku_num)
            .cloned())
    }

    async fn get_location(&self, id: LocationId) -> Result<Option<Location>, StoreError> {
        Ok(self.read()?.locations.get(&id).cloned())
    }

    async fn append_movement(&self, movement: &NewMovement) -> Result<MovementId, StoreError> {
        let mut tables = self.write()?;
        Self::append_locked(&mut tables, movement, Utc::now())
    }

    async fn balances(&self, sku_filter: &str, page: Page) -> Result<BalancePage, StoreError> {
        let tables = self.read()?;

        let matching: Vec<&Movement> = tables
            .movements
            .iter()
            .filter(|m| {
                tables
                    .skus
                    .get(&m.sku_id)
                    .is_some_and(|s| matches_filter(&s.sku_num, sku_filter))
            })
            .collect();

        let folded = fold_balances(matching.iter().copied());

        let mut groups: Vec<(&Sku, &Location, i64)> = folded
            .into_iter()
            .filter(|(_, on_hand)| *on_hand != 0)
            .filter_map(|((sku_id, loc_id), on_hand)| {
                let sku = tables.skus.get(&sku_id)?;
                let loc = tables.locations.get(&loc_id)?;
                Some((sku, loc, on_hand))
            })
            .collect();

        groups.sort_by_key(|(sku, loc, _)| (loc.sort_key(), sku.sku_num.clone()));

        let grand_total: i64 = groups.iter().map(|(_, _, on_hand)| on_hand).sum();
        let total_rows = groups.len() as u64;

        let rows = groups
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size() as usize)
            .map(|(sku, loc, on_hand)| BalanceRow {
                sku_num: sku.sku_num.clone(),
                description: sku.description.clone(),
                bin_code: loc.bin_code(),
                on_hand,
            })
            .collect();

        Ok(BalancePage {
            rows,
            grand_total,
            total_rows,
        })
    }

    async fn movement_details(
        &self,
        sku_filter: &str,
    ) -> Result<(Vec<DetailRow>, DetailStrategy), StoreError> {
        let tables = self.read()?;

        let mut matching: Vec<&Movement> = tables
            .movements
            .iter()
            .filter(|m| {
                tables
                    .skus
                    .get(&m.sku_id)
                    .is_some_and(|s| matches_filter(&s.sku_num, sku_filter))
            })
            .collect();

        // Accumulation order: per-pair ascending chronology, ids breaking ties.
        matching.sort_by_key(|m| (m.sku_id, m.loc_id, m.created_at, m.id));

        let mut acc = RunningBalances::new();
        let mut rows: Vec<DetailRow> = matching
            .into_iter()
            .filter_map(|m| {
                let sku = tables.skus.get(&m.sku_id)?;
                let loc = tables.locations.get(&m.loc_id)?;
                let running_balance = acc.apply(m.sku_id, m.loc_id, m.signed_delta());
                Some(DetailRow {
                    id: m.id,
                    sku_num: sku.sku_num.clone(),
                    bin_code: loc.bin_code(),
                    movement_type: m.movement_type,
                    quantity_change: m.quantity_change,
                    reference: m.reference.clone(),
                    user_id: m.user_id,
                    created_at: m.created_at,
                    running_balance,
                })
            })
            .collect();

        // Display order: newest first, higher id first on equal timestamps.
        rows.sort_by_key(|r| Reverse((r.created_at, r.id)));

        Ok((rows, DetailStrategy::Fallback))
    }

    async fn queue_receipt(&self, receipt: &NewReceipt) -> Result<QueueEntryId, StoreError> {
        receipt.validate()?;
        let mut tables = self.write()?;
        if !tables.skus.contains_key(&receipt.sku_id) {
            return Err(DomainError::validation(format!(
                "sku_id {} does not reference an existing SKU",
                receipt.sku_id
            ))
            .into());
        }
        tables.next_queue_id += 1;
        let id = QueueEntryId::new(tables.next_queue_id);
        tables.queue.insert(
            id,
            QueueEntry {
                id,
                sku_id: receipt.sku_id,
                quantity: receipt.quantity,
                supplier_name: receipt.supplier_name.clone(),
                po_number: receipt.po_number.clone(),
                reference_note: receipt.reference_note.clone(),
                received_by: receipt.received_by,
                status: QueueStatus::Pending,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn get_queue_entry(&self, id: QueueEntryId) -> Result<Option<QueueEntry>, StoreError> {
        Ok(self.read()?.queue.get(&id).cloned())
    }

    async fn approve_receipt(
        &self,
        id: QueueEntryId,
        receiving_dock: LocationId,
    ) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let Some(entry) = tables.queue.get(&id).cloned() else {
            return Ok(());
        };
        // Non-PENDING entries fall out here: single-fire, no duplicate write.
        let Some(movement) = entry.approval_movement(receiving_dock) else {
            return Ok(());
        };
        Self::append_locked(&mut tables, &movement, Utc::now())?;
        if let Some(entry) = tables.queue.get_mut(&id) {
            entry.status = QueueStatus::Approved;
        }
        Ok(())
    }

    async fn reject_receipt(&self, id: QueueEntryId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if let Some(entry) = tables.queue.get_mut(&id) {
            if entry.is_pending() {
                entry.status = QueueStatus::Rejected;
            }
        }
        Ok(())
    }

    async fn inventory_quantity(
        &self,
        sku_id: SkuId,
        loc_id: LocationId,
    ) -> Result<i64, StoreError> {
        Ok(self
            .read()?
            .inventory
            .get(&(sku_id, loc_id))
            .copied()
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockbook_core::UserId;
    use stockbook_warehouse::MovementType;

    fn movement(sku_id: SkuId, loc_id: LocationId, ty: MovementType, qty: i64) -> NewMovement {
        NewMovement {
            sku_id,
            loc_id,
            movement_type: ty,
            quantity_change: qty,
            reference: String::new(),
            user_id: UserId::new(1),
        }
    }

    #[tokio::test]
    async fn append_rejects_dangling_references() {
        let store = InMemoryLedgerStore::new();
        let sku = store.create_sku("A1", "widget").await.unwrap();

        let err = store
            .append_movement(&movement(sku, LocationId::new(99), MovementType::In, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn append_rejects_negative_balance() {
        let store = InMemoryLedgerStore::new();
        let sku = store.create_sku("A1", "widget").await.unwrap();
        let loc = store.create_location("R1", "1", "1", "FRONT").await.unwrap();

        store
            .append_movement(&movement(sku, loc, MovementType::In, 5))
            .await
            .unwrap();
        let err = store
            .append_movement(&movement(sku, loc, MovementType::Out, 6))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));

        // The failed append left nothing behind.
        assert_eq!(store.movement_count(), 1);
        assert_eq!(store.inventory_quantity(sku, loc).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn duplicate_sku_num_conflicts() {
        let store = InMemoryLedgerStore::new();
        store.create_sku("A1", "widget").await.unwrap();
        let err = store.create_sku("A1", "again").await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));
    }

    #[test]
    fn filter_is_case_insensitive_containment() {
        assert!(matches_filter("WID-100", "id-1"));
        assert!(matches_filter("WID-100", ""));
        assert!(!matches_filter("WID-100", "XYZ"));
    }
}
