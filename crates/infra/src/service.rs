//! Collaborator-facing service facade.
//!
//! Read paths (balance listing, detail traces) degrade on storage failure:
//! they return empty results with an error indicator so callers can render a
//! partial view. Mutating paths propagate errors after the storage layer has
//! rolled back.

use serde::Serialize;

use stockbook_core::{DomainError, LocationId, MovementId, QueueEntryId};
use stockbook_warehouse::{NewMovement, NewReceipt, Page, Sku};

use crate::store::{BalanceRow, DetailRow, DetailStrategy, LedgerStore, StoreError};

/// Balance listing result. `rows` is one page; `grand_total` and
/// `total_rows` cover every matching non-zero group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceList {
    pub rows: Vec<BalanceRow>,
    pub grand_total: i64,
    pub total_rows: u64,
    pub page: u32,
    pub page_size: u32,
    pub page_count: u32,
    /// Set when the read degraded on a storage failure; rows are empty and
    /// totals zeroed.
    pub error: Option<String>,
}

/// Movement detail result: the running-balance trace, newest movement first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovementDetail {
    pub rows: Vec<DetailRow>,
    /// Which computation path produced the rows. Diagnostic only.
    pub strategy: DetailStrategy,
    /// Set when the read degraded on a storage failure.
    pub error: Option<String>,
}

/// The inventory engine's collaborator surface.
///
/// Holds the store and the designated receiving-dock location explicitly;
/// no ambient database handle or session state.
#[derive(Debug, Clone)]
pub struct WarehouseService<S> {
    store: S,
    receiving_dock: LocationId,
}

impl<S: LedgerStore> WarehouseService<S> {
    pub fn new(store: S, receiving_dock: LocationId) -> Self {
        Self {
            store,
            receiving_dock,
        }
    }

    /// The underlying store, for collaborators needing registry access.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn receiving_dock(&self) -> LocationId {
        self.receiving_dock
    }

    /// Record one ledger movement.
    pub async fn append_movement(&self, movement: NewMovement) -> Result<MovementId, StoreError> {
        self.store.append_movement(&movement).await
    }

    /// Look up a SKU by its business key, for collaborators rendering a
    /// single-SKU view.
    pub async fn sku_by_num(&self, sku_num: &str) -> Result<Sku, StoreError> {
        self.store
            .find_sku(sku_num)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("sku {sku_num}")).into())
    }

    /// Paginated on-hand balances for SKUs matching the filter.
    pub async fn list_balances(&self, sku_filter: &str, page: u32, page_size: u32) -> BalanceList {
        let page = Page::clamped(page, page_size);
        match self.store.balances(sku_filter, page).await {
            Ok(balances) => BalanceList {
                page_count: page.page_count(balances.total_rows),
                rows: balances.rows,
                grand_total: balances.grand_total,
                total_rows: balances.total_rows,
                page: page.page(),
                page_size: page.size(),
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "balance listing degraded to empty result");
                BalanceList {
                    rows: Vec::new(),
                    grand_total: 0,
                    total_rows: 0,
                    page: page.page(),
                    page_size: page.size(),
                    page_count: page.page_count(0),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Running-balance trace for SKUs matching the filter, newest first.
    pub async fn details_for_sku(&self, sku_filter: &str) -> MovementDetail {
        match self.store.movement_details(sku_filter).await {
            Ok((rows, strategy)) => MovementDetail {
                rows,
                strategy,
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "movement detail degraded to empty result");
                MovementDetail {
                    rows: Vec::new(),
                    strategy: DetailStrategy::Fallback,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Stage an incoming receipt for approval.
    pub async fn queue_receipt(&self, receipt: NewReceipt) -> Result<QueueEntryId, StoreError> {
        self.store.queue_receipt(&receipt).await
    }

    /// Approve a pending receipt: posts inventory and one IN movement at the
    /// receiving dock. No-op when the entry is missing or already settled.
    pub async fn approve_receipt(&self, id: QueueEntryId) -> Result<(), StoreError> {
        self.store.approve_receipt(id, self.receiving_dock).await
    }

    /// Reject a pending receipt. No inventory or ledger side effects.
    pub async fn reject_receipt(&self, id: QueueEntryId) -> Result<(), StoreError> {
        self.store.reject_receipt(id).await
    }
}
