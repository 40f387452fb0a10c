//! The ledger store: append-only movements plus the derived read paths.
//!
//! Two implementations share this trait: [`PostgresLedgerStore`] (production,
//! sqlx) and [`InMemoryLedgerStore`] (tests/dev). Both must satisfy the same
//! post-condition: balances and running-balance traces derived from the same
//! ledger contents are identical, whichever computation path produced them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use stockbook_core::{DomainError, LocationId, MovementId, QueueEntryId, SkuId, UserId};
use stockbook_warehouse::{
    Location, MovementType, NewMovement, NewReceipt, Page, QueueEntry, Sku,
};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;

/// Storage operation error.
///
/// Domain failures (validation, missing references, conflicts) pass through
/// unchanged; everything else (connectivity, query failures, corrupted rows)
/// is a `Storage` error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

/// One row of the balance listing: a (SKU, location) pair with a non-zero
/// folded balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceRow {
    pub sku_num: String,
    pub description: String,
    pub bin_code: String,
    pub on_hand: i64,
}

/// One page of balance rows plus the unpaged totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalancePage {
    pub rows: Vec<BalanceRow>,
    /// Sum of `on_hand` across ALL matching non-zero groups, not just this page.
    pub grand_total: i64,
    /// Count of all matching non-zero groups.
    pub total_rows: u64,
}

/// Which computation path produced a detail trace. Diagnostic only; the two
/// strategies are observably identical.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailStrategy {
    /// Server-side running sum via a window function.
    Native,
    /// Ordered scan plus in-memory accumulation.
    Fallback,
}

impl DetailStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailStrategy::Native => "native",
            DetailStrategy::Fallback => "fallback",
        }
    }
}

/// One movement in a detail trace. `quantity_change` is as stored (signed
/// only for ADJUSTMENT); `running_balance` is the cumulative signed sum for
/// this row's (SKU, location) pair up to and including this row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailRow {
    pub id: MovementId,
    pub sku_num: String,
    pub bin_code: String,
    pub movement_type: MovementType,
    pub quantity_change: i64,
    pub reference: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub running_balance: i64,
}

/// Append-only movement ledger with derived balance reads, the SKU/location
/// registry it references, and the receiving queue.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Register a SKU. Duplicate `sku_num` is a conflict.
    async fn create_sku(&self, sku_num: &str, description: &str) -> Result<SkuId, StoreError>;

    /// Register a bin location from its decomposed parts. Duplicate
    /// decomposed code is a conflict.
    async fn create_location(
        &self,
        row_code: &str,
        bay_num: &str,
        level_code: &str,
        side: &str,
    ) -> Result<LocationId, StoreError>;

    async fn get_sku(&self, id: SkuId) -> Result<Option<Sku>, StoreError>;

    async fn find_sku(&self, sku_num: &str) -> Result<Option<Sku>, StoreError>;

    async fn get_location(&self, id: LocationId) -> Result<Option<Location>, StoreError>;

    /// Append one movement (append-only; movements are never updated or
    /// deleted through this interface). Atomically maintains the
    /// denormalized inventory quantity for the movement's (SKU, location)
    /// pair; driving that quantity negative rolls back with a conflict.
    async fn append_movement(&self, movement: &NewMovement) -> Result<MovementId, StoreError>;

    /// Balance listing: fold signed deltas per (SKU, location) for SKUs
    /// matching the literal, case-insensitive substring filter; drop groups
    /// folding to exactly zero; order by (row, bay numerically, level,
    /// side); return the requested page plus unpaged totals.
    async fn balances(&self, sku_filter: &str, page: Page) -> Result<BalancePage, StoreError>;

    /// Movement detail trace for SKUs matching the filter, newest first
    /// (ties: higher id first), each row carrying its running balance.
    async fn movement_details(
        &self,
        sku_filter: &str,
    ) -> Result<(Vec<DetailRow>, DetailStrategy), StoreError>;

    /// Stage a receipt into the queue in PENDING state.
    async fn queue_receipt(&self, receipt: &NewReceipt) -> Result<QueueEntryId, StoreError>;

    async fn get_queue_entry(&self, id: QueueEntryId) -> Result<Option<QueueEntry>, StoreError>;

    /// Approve a PENDING entry: one inventory increment at the receiving
    /// dock, one IN movement, and the transition to APPROVED, in a single
    /// atomic unit. Missing or non-PENDING entries are a silent no-op.
    async fn approve_receipt(
        &self,
        id: QueueEntryId,
        receiving_dock: LocationId,
    ) -> Result<(), StoreError>;

    /// Reject a PENDING entry (terminal, no inventory/ledger side effects).
    /// Missing or non-PENDING entries are a silent no-op.
    async fn reject_receipt(&self, id: QueueEntryId) -> Result<(), StoreError>;

    /// Current denormalized inventory quantity (zero when no row exists).
    async fn inventory_quantity(
        &self,
        sku_id: SkuId,
        loc_id: LocationId,
    ) -> Result<i64, StoreError>;
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn create_sku(&self, sku_num: &str, description: &str) -> Result<SkuId, StoreError> {
        (**self).create_sku(sku_num, description).await
    }

    async fn create_location(
        &self,
        row_code: &str,
        bay_num: &str,
        level_code: &str,
        side: &str,
    ) -> Result<LocationId, StoreError> {
        (**self).create_location(row_code, bay_num, level_code, side).await
    }

    async fn get_sku(&self, id: SkuId) -> Result<Option<Sku>, StoreError> {
        (**self).get_sku(id).await
    }

    async fn find_sku(&self, sku_num: &str) -> Result<Option<Sku>, StoreError> {
        (**self).find_sku(sku_num).await
    }

    async fn get_location(&self, id: LocationId) -> Result<Option<Location>, StoreError> {
        (**self).get_location(id).await
    }

    async fn append_movement(&self, movement: &NewMovement) -> Result<MovementId, StoreError> {
        (**self).append_movement(movement).await
    }

    async fn balances(&self, sku_filter: &str, page: Page) -> Result<BalancePage, StoreError> {
        (**self).balances(sku_filter, page).await
    }

    async fn movement_details(
        &self,
        sku_filter: &str,
    ) -> Result<(Vec<DetailRow>, DetailStrategy), StoreError> {
        (**self).movement_details(sku_filter).await
    }

    async fn queue_receipt(&self, receipt: &NewReceipt) -> Result<QueueEntryId, StoreError> {
        (**self).queue_receipt(receipt).await
    }

    async fn get_queue_entry(&self, id: QueueEntryId) -> Result<Option<QueueEntry>, StoreError> {
        (**self).get_queue_entry(id).await
    }

    async fn approve_receipt(
        &self,
        id: QueueEntryId,
        receiving_dock: LocationId,
    ) -> Result<(), StoreError> {
        (**self).approve_receipt(id, receiving_dock).await
    }

    async fn reject_receipt(&self, id: QueueEntryId) -> Result<(), StoreError> {
        (**self).reject_receipt(id).await
    }

    async fn inventory_quantity(
        &self,
        sku_id: SkuId,
        loc_id: LocationId,
    ) -> Result<i64, StoreError> {
        (**self).inventory_quantity(sku_id, loc_id).await
    }
}
