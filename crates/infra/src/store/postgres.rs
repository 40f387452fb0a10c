//! Postgres-backed ledger store.
//!
//! Movements are append-only at the database level; every multi-write
//! operation (append + inventory upsert, receiving approval) runs in a
//! transaction so a failure leaves no partial state.
//!
//! ## Error Mapping
//!
//! SQLSTATE codes map onto the error taxonomy: `23505` (unique violation) →
//! `Conflict`, `23503` (foreign key violation, i.e. a dangling SKU/location
//! reference) → `Validation`, `23514` (check violation) → `Validation`,
//! anything else → `Storage`.
//!
//! ## Running-balance strategies
//!
//! Window-function support is probed once at connect time. When available,
//! detail traces use a server-side running sum; when not, or when the native
//! query fails at call time, the store falls back to an ordered scan with
//! in-memory accumulation. Both paths produce identical rows; the strategy
//! label is diagnostic only.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{FromRow, Postgres, Row, Transaction};
use std::cmp::Reverse;
use tracing::instrument;

use stockbook_core::{DomainError, LocationId, MovementId, QueueEntryId, SkuId, UserId};
use stockbook_warehouse::{
    Location, NewMovement, NewReceipt, Page, QueueEntry, RunningBalances, Sku,
    validate_location_parts, validate_sku_num,
};

use super::{BalancePage, BalanceRow, DetailRow, DetailStrategy, LedgerStore, StoreError};
use crate::config::DatabaseConfig;
use async_trait::async_trait;

/// Schema bootstrap, idempotent. The movements table has no UPDATE/DELETE
/// path in this crate; corrections are new ADJUSTMENT rows.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS skus (
    id          BIGSERIAL PRIMARY KEY,
    sku_num     TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    status      TEXT NOT NULL DEFAULT 'ACTIVE'
                CHECK (status IN ('ACTIVE', 'INACTIVE'))
);

CREATE TABLE IF NOT EXISTS locations (
    id         BIGSERIAL PRIMARY KEY,
    row_code   TEXT NOT NULL,
    bay_num    TEXT NOT NULL,
    level_code TEXT NOT NULL,
    side       TEXT NOT NULL,
    UNIQUE (row_code, bay_num, level_code, side)
);

CREATE TABLE IF NOT EXISTS inventory (
    sku_id   BIGINT NOT NULL REFERENCES skus (id),
    loc_id   BIGINT NOT NULL REFERENCES locations (id),
    quantity BIGINT NOT NULL DEFAULT 0,
    PRIMARY KEY (sku_id, loc_id)
);

CREATE TABLE IF NOT EXISTS movements (
    id              BIGSERIAL PRIMARY KEY,
    sku_id          BIGINT NOT NULL REFERENCES skus (id),
    loc_id          BIGINT NOT NULL REFERENCES locations (id),
    movement_type   TEXT NOT NULL
                    CHECK (movement_type IN ('IN', 'OUT', 'ADJUSTMENT')),
    quantity_change BIGINT NOT NULL,
    reference       TEXT NOT NULL DEFAULT '',
    user_id         BIGINT NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS movements_pair_order_idx
    ON movements (sku_id, loc_id, created_at, id);

CREATE TABLE IF NOT EXISTS receiving_queue (
    id             BIGSERIAL PRIMARY KEY,
    sku_id         BIGINT NOT NULL REFERENCES skus (id),
    quantity       BIGINT NOT NULL CHECK (quantity > 0),
    supplier_name  TEXT NOT NULL DEFAULT '',
    po_number      TEXT NOT NULL DEFAULT '',
    reference_note TEXT NOT NULL DEFAULT '',
    received_by    BIGINT NOT NULL,
    status         TEXT NOT NULL DEFAULT 'PENDING'
                   CHECK (status IN ('PENDING', 'APPROVED', 'REJECTED')),
    created_at     TIMESTAMPTZ NOT NULL DEFAULT now()
);
"#;

/// Postgres-backed ledger store. Cheap to clone; all clones share the pool.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
    supports_window: bool,
}

impl PostgresLedgerStore {
    /// Connect a pool from configuration and probe window-function support.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&config.url())
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::with_pool(pool).await)
    }

    /// Wrap an existing pool, probing window-function support once.
    pub async fn with_pool(pool: PgPool) -> Self {
        let supports_window = sqlx::query("SELECT SUM(v) OVER () FROM (SELECT 1 AS v) AS probe")
            .fetch_one(&pool)
            .await
            .is_ok();
        if !supports_window {
            tracing::warn!("window aggregation unavailable; detail traces pinned to fallback");
        }
        Self {
            pool,
            supports_window,
        }
    }

    /// Create the schema if it does not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    /// Which detail strategy the capability probe selected.
    pub fn detail_strategy(&self) -> DetailStrategy {
        if self.supports_window {
            DetailStrategy::Native
        } else {
            DetailStrategy::Fallback
        }
    }

    async fn details_native(&self, sku_filter: &str) -> Result<Vec<DetailRow>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                m.id,
                s.sku_num,
                l.row_code,
                l.bay_num,
                l.level_code,
                l.side,
                m.movement_type,
                m.quantity_change,
                m.reference,
                m.user_id,
                m.created_at,
                (SUM(CASE WHEN m.movement_type = 'OUT'
                          THEN -m.quantity_change
                          ELSE m.quantity_change END)
                    OVER (PARTITION BY m.sku_id, m.loc_id
                          ORDER BY m.created_at ASC, m.id ASC))::bigint
                    AS running_balance
            FROM movements m
            JOIN skus s ON s.id = m.sku_id
            JOIN locations l ON l.id = m.loc_id
            WHERE s.sku_num ILIKE $1 ESCAPE '\'
            ORDER BY m.created_at DESC, m.id DESC
            "#,
        )
        .bind(like_pattern(sku_filter))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("details_native", e))?;

        let mut details = Vec::with_capacity(rows.len());
        for row in rows {
            let sql_row = NativeDetailRow::from_row(&row)
                .map_err(|e| StoreError::storage(format!("failed to read detail row: {e}")))?;
            details.push(sql_row.try_into()?);
        }
        Ok(details)
    }

    async fn details_fallback(&self, sku_filter: &str) -> Result<Vec<DetailRow>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                m.id,
                m.sku_id,
                m.loc_id,
                s.sku_num,
                l.row_code,
                l.bay_num,
                l.level_code,
                l.side,
                m.movement_type,
                m.quantity_change,
                m.reference,
                m.user_id,
                m.created_at
            FROM movements m
            JOIN skus s ON s.id = m.sku_id
            JOIN locations l ON l.id = m.loc_id
            WHERE s.sku_num ILIKE $1 ESCAPE '\'
            ORDER BY m.sku_id ASC, m.loc_id ASC, m.created_at ASC, m.id ASC
            "#,
        )
        .bind(like_pattern(sku_filter))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("details_fallback", e))?;

        let mut acc = RunningBalances::new();
        let mut details = Vec::with_capacity(rows.len());
        for row in rows {
            let sql_row = FallbackDetailRow::from_row(&row)
                .map_err(|e| StoreError::storage(format!("failed to read detail row: {e}")))?;
            let movement_type = parse_movement_type(&sql_row.movement_type)?;
            let running_balance = acc.apply(
                SkuId::new(sql_row.sku_id),
                LocationId::new(sql_row.loc_id),
                movement_type.signed(sql_row.quantity_change),
            );
            details.push(DetailRow {
                id: MovementId::new(sql_row.id),
                sku_num: sql_row.sku_num,
                bin_code: bin_code(
                    &sql_row.row_code,
                    &sql_row.bay_num,
                    &sql_row.level_code,
                    &sql_row.side,
                ),
                movement_type,
                quantity_change: sql_row.quantity_change,
                reference: sql_row.reference,
                user_id: UserId::new(sql_row.user_id),
                created_at: sql_row.created_at,
                running_balance,
            });
        }

        // Accumulation ran in per-pair ascending order; display wants global
        // descending (created_at, id).
        details.sort_by_key(|r| Reverse((r.created_at, r.id)));
        Ok(details)
    }

    async fn insert_movement_tx(
        tx: &mut Transaction<'_, Postgres>,
        movement: &NewMovement,
    ) -> Result<MovementId, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO movements (sku_id, loc_id, movement_type, quantity_change, reference, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(movement.sku_id.as_i64())
        .bind(movement.loc_id.as_i64())
        .bind(movement.movement_type.as_str())
        .bind(movement.quantity_change)
        .bind(&movement.reference)
        .bind(movement.user_id.as_i64())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_movement", e))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| StoreError::storage(format!("failed to read movement id: {e}")))?;
        Ok(MovementId::new(id))
    }

    /// Upsert the denormalized inventory quantity and return the new value.
    async fn upsert_inventory_tx(
        tx: &mut Transaction<'_, Postgres>,
        sku_id: SkuId,
        loc_id: LocationId,
        signed_delta: i64,
    ) -> Result<i64, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO inventory (sku_id, loc_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (sku_id, loc_id)
                DO UPDATE SET quantity = inventory.quantity + EXCLUDED.quantity
            RETURNING quantity
            "#,
        )
        .bind(sku_id.as_i64())
        .bind(loc_id.as_i64())
        .bind(signed_delta)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("upsert_inventory", e))?;

        row.try_get("quantity")
            .map_err(|e| StoreError::storage(format!("failed to read inventory quantity: {e}")))
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[instrument(skip(self, description), err)]
    async fn create_sku(&self, sku_num: &str, description: &str) -> Result<SkuId, StoreError> {
        validate_sku_num(sku_num)?;
        let row = sqlx::query("INSERT INTO skus (sku_num, description) VALUES ($1, $2) RETURNING id")
            .bind(sku_num)
            .bind(description)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_sku", e))?;
        let id: i64 = row
            .try_get("id")
            .map_err(|e| StoreError::storage(format!("failed to read sku id: {e}")))?;
        Ok(SkuId::new(id))
    }

    #[instrument(skip(self), err)]
    async fn create_location(
        &self,
        row_code: &str,
        bay_num: &str,
        level_code: &str,
        side: &str,
    ) -> Result<LocationId, StoreError> {
        validate_location_parts(row_code, bay_num, level_code, side)?;
        let row = sqlx::query(
            r#"
            INSERT INTO locations (row_code, bay_num, level_code, side)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(row_code)
        .bind(bay_num)
        .bind(level_code)
        .bind(side)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_location", e))?;
        let id: i64 = row
            .try_get("id")
            .map_err(|e| StoreError::storage(format!("failed to read location id: {e}")))?;
        Ok(LocationId::new(id))
    }

    async fn get_sku(&self, id: SkuId) -> Result<Option<Sku>, StoreError> {
        let row = sqlx::query("SELECT id, sku_num, description, status FROM skus WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_sku", e))?;
        row.map(|r| sku_from_row(&r)).transpose()
    }

    async fn find_sku(&self, sku_num: &str) -> Result<Option<Sku>, StoreError> {
        let row =
            sqlx::query("SELECT id, sku_num, description, status FROM skus WHERE sku_num = $1")
                .bind(sku_num)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("find_sku", e))?;
        row.map(|r| sku_from_row(&r)).transpose()
    }

    async fn get_location(&self, id: LocationId) -> Result<Option<Location>, StoreError> {
        let row = sqlx::query(
            "SELECT id, row_code, bay_num, level_code, side FROM locations WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_location", e))?;
        row.map(|r| location_from_row(&r)).transpose()
    }

    #[instrument(
        skip(self, movement),
        fields(
            sku_id = movement.sku_id.as_i64(),
            loc_id = movement.loc_id.as_i64(),
            movement_type = movement.movement_type.as_str()
        ),
        err
    )]
    async fn append_movement(&self, movement: &NewMovement) -> Result<MovementId, StoreError> {
        movement.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        let id = Self::insert_movement_tx(&mut tx, movement).await?;
        let quantity = Self::upsert_inventory_tx(
            &mut tx,
            movement.sku_id,
            movement.loc_id,
            movement.signed_delta(),
        )
        .await?;

        if quantity < 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(DomainError::conflict(format!(
                "movement would drive balance negative ({} -> {quantity})",
                quantity - movement.signed_delta()
            ))
            .into());
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(id)
    }

    #[instrument(skip(self), fields(page = page.page(), page_size = page.size()), err)]
    async fn balances(&self, sku_filter: &str, page: Page) -> Result<BalancePage, StoreError> {
        let pattern = like_pattern(sku_filter);

        let totals = sqlx::query(
            r#"
            WITH balances AS (
                SELECT m.sku_id, m.loc_id,
                       SUM(CASE WHEN m.movement_type = 'OUT'
                                THEN -m.quantity_change
                                ELSE m.quantity_change END)::bigint AS on_hand
                FROM movements m
                JOIN skus s ON s.id = m.sku_id
                WHERE s.sku_num ILIKE $1 ESCAPE '\'
                GROUP BY m.sku_id, m.loc_id
                HAVING SUM(CASE WHEN m.movement_type = 'OUT'
                                THEN -m.quantity_change
                                ELSE m.quantity_change END) <> 0
            )
            SELECT COUNT(*) AS total_rows,
                   COALESCE(SUM(on_hand), 0)::bigint AS grand_total
            FROM balances
            "#,
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("balance_totals", e))?;

        let total_rows: i64 = totals
            .try_get("total_rows")
            .map_err(|e| StoreError::storage(format!("failed to read total_rows: {e}")))?;
        let grand_total: i64 = totals
            .try_get("grand_total")
            .map_err(|e| StoreError::storage(format!("failed to read grand_total: {e}")))?;

        let rows = sqlx::query(
            r#"
            WITH balances AS (
                SELECT m.sku_id, m.loc_id,
                       SUM(CASE WHEN m.movement_type = 'OUT'
                                THEN -m.quantity_change
                                ELSE m.quantity_change END)::bigint AS on_hand
                FROM movements m
                JOIN skus s ON s.id = m.sku_id
                WHERE s.sku_num ILIKE $1 ESCAPE '\'
                GROUP BY m.sku_id, m.loc_id
                HAVING SUM(CASE WHEN m.movement_type = 'OUT'
                                THEN -m.quantity_change
                                ELSE m.quantity_change END) <> 0
            )
            SELECT s.sku_num, s.description,
                   l.row_code, l.bay_num, l.level_code, l.side,
                   b.on_hand
            FROM balances b
            JOIN skus s ON s.id = b.sku_id
            JOIN locations l ON l.id = b.loc_id
            ORDER BY l.row_code ASC, (l.bay_num)::int ASC,
                     l.level_code ASC, l.side ASC, s.sku_num ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&pattern)
        .bind(page.size() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("balance_rows", e))?;

        let mut balance_rows = Vec::with_capacity(rows.len());
        for row in rows {
            let sql_row = BalanceRowSql::from_row(&row)
                .map_err(|e| StoreError::storage(format!("failed to read balance row: {e}")))?;
            balance_rows.push(BalanceRow {
                sku_num: sql_row.sku_num,
                description: sql_row.description,
                bin_code: bin_code(
                    &sql_row.row_code,
                    &sql_row.bay_num,
                    &sql_row.level_code,
                    &sql_row.side,
                ),
                on_hand: sql_row.on_hand,
            });
        }

        Ok(BalancePage {
            rows: balance_rows,
            grand_total,
            total_rows: total_rows as u64,
        })
    }

    #[instrument(skip(self), err)]
    async fn movement_details(
        &self,
        sku_filter: &str,
    ) -> Result<(Vec<DetailRow>, DetailStrategy), StoreError> {
        if self.supports_window {
            match self.details_native(sku_filter).await {
                Ok(rows) => return Ok((rows, DetailStrategy::Native)),
                Err(e) => {
                    tracing::warn!(error = %e, "native running-balance query failed; falling back");
                }
            }
        }
        let rows = self.details_fallback(sku_filter).await?;
        Ok((rows, DetailStrategy::Fallback))
    }

    #[instrument(skip(self, receipt), fields(sku_id = receipt.sku_id.as_i64()), err)]
    async fn queue_receipt(&self, receipt: &NewReceipt) -> Result<QueueEntryId, StoreError> {
        receipt.validate()?;
        let row = sqlx::query(
            r#"
            INSERT INTO receiving_queue
                (sku_id, quantity, supplier_name, po_number, reference_note, received_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(receipt.sku_id.as_i64())
        .bind(receipt.quantity)
        .bind(&receipt.supplier_name)
        .bind(&receipt.po_number)
        .bind(&receipt.reference_note)
        .bind(receipt.received_by.as_i64())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("queue_receipt", e))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| StoreError::storage(format!("failed to read queue id: {e}")))?;
        Ok(QueueEntryId::new(id))
    }

    async fn get_queue_entry(&self, id: QueueEntryId) -> Result<Option<QueueEntry>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, sku_id, quantity, supplier_name, po_number, reference_note,
                   received_by, status, created_at
            FROM receiving_queue
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_queue_entry", e))?;
        row.map(|r| queue_entry_from_row(&r)).transpose()
    }

    #[instrument(skip(self), fields(queue_id = id.as_i64()), err)]
    async fn approve_receipt(
        &self,
        id: QueueEntryId,
        receiving_dock: LocationId,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        // Row lock serializes concurrent approvals of the same entry; the
        // second transaction sees a non-PENDING status.
        let row = sqlx::query(
            r#"
            SELECT id, sku_id, quantity, supplier_name, po_number, reference_note,
                   received_by, status, created_at
            FROM receiving_queue
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_queue_entry", e))?;

        let Some(row) = row else {
            return Ok(());
        };
        let entry = queue_entry_from_row(&row)?;
        let Some(movement) = entry.approval_movement(receiving_dock) else {
            return Ok(());
        };

        Self::insert_movement_tx(&mut tx, &movement).await?;
        Self::upsert_inventory_tx(&mut tx, movement.sku_id, movement.loc_id, movement.quantity_change)
            .await?;

        sqlx::query("UPDATE receiving_queue SET status = 'APPROVED' WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("approve_receipt", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(queue_id = id.as_i64()), err)]
    async fn reject_receipt(&self, id: QueueEntryId) -> Result<(), StoreError> {
        sqlx::query("UPDATE receiving_queue SET status = 'REJECTED' WHERE id = $1 AND status = 'PENDING'")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("reject_receipt", e))?;
        Ok(())
    }

    async fn inventory_quantity(
        &self,
        sku_id: SkuId,
        loc_id: LocationId,
    ) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT quantity FROM inventory WHERE sku_id = $1 AND loc_id = $2")
            .bind(sku_id.as_i64())
            .bind(loc_id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("inventory_quantity", e))?;
        match row {
            Some(row) => row
                .try_get("quantity")
                .map_err(|e| StoreError::storage(format!("failed to read quantity: {e}"))),
            None => Ok(0),
        }
    }
}

/// Escape ILIKE metacharacters and wrap in containment wildcards: the filter
/// is a literal substring, never a user-supplied pattern.
fn like_pattern(filter: &str) -> String {
    let mut escaped = String::with_capacity(filter.len() + 2);
    for c in filter.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("%{escaped}%")
}

fn bin_code(row_code: &str, bay_num: &str, level_code: &str, side: &str) -> String {
    format!("{row_code}-{bay_num}-{level_code}-{side}")
}

fn parse_movement_type(raw: &str) -> Result<stockbook_warehouse::MovementType, StoreError> {
    raw.parse()
        .map_err(|e| StoreError::storage(format!("corrupt movement_type column: {e}")))
}

fn sku_from_row(row: &PgRow) -> Result<Sku, StoreError> {
    let id: i64 = row
        .try_get("id")
        .map_err(|e| StoreError::storage(format!("failed to read sku row: {e}")))?;
    let sku_num: String = row
        .try_get("sku_num")
        .map_err(|e| StoreError::storage(format!("failed to read sku row: {e}")))?;
    let description: String = row
        .try_get("description")
        .map_err(|e| StoreError::storage(format!("failed to read sku row: {e}")))?;
    let status: String = row
        .try_get("status")
        .map_err(|e| StoreError::storage(format!("failed to read sku row: {e}")))?;
    Ok(Sku {
        id: SkuId::new(id),
        sku_num,
        description,
        status: status
            .parse()
            .map_err(|e| StoreError::storage(format!("corrupt sku status column: {e}")))?,
    })
}

fn location_from_row(row: &PgRow) -> Result<Location, StoreError> {
    let read = |col: &str| -> Result<String, StoreError> {
        row.try_get(col)
            .map_err(|e| StoreError::storage(format!("failed to read location row: {e}")))
    };
    let id: i64 = row
        .try_get("id")
        .map_err(|e| StoreError::storage(format!("failed to read location row: {e}")))?;
    Ok(Location {
        id: LocationId::new(id),
        row_code: read("row_code")?,
        bay_num: read("bay_num")?,
        level_code: read("level_code")?,
        side: read("side")?,
    })
}

fn queue_entry_from_row(row: &PgRow) -> Result<QueueEntry, StoreError> {
    let err = |e: sqlx::Error| StoreError::storage(format!("failed to read queue row: {e}"));
    let id: i64 = row.try_get("id").map_err(err)?;
    let sku_id: i64 = row.try_get("sku_id").map_err(err)?;
    let quantity: i64 = row.try_get("quantity").map_err(err)?;
    let supplier_name: String = row.try_get("supplier_name").map_err(err)?;
    let po_number: String = row.try_get("po_number").map_err(err)?;
    let reference_note: String = row.try_get("reference_note").map_err(err)?;
    let received_by: i64 = row.try_get("received_by").map_err(err)?;
    let status: String = row.try_get("status").map_err(err)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(err)?;
    Ok(QueueEntry {
        id: QueueEntryId::new(id),
        sku_id: SkuId::new(sku_id),
        quantity,
        supplier_name,
        po_number,
        reference_note,
        received_by: UserId::new(received_by),
        status: status
            .parse()
            .map_err(|e| StoreError::storage(format!("corrupt queue status column: {e}")))?,
        created_at,
    })
}

/// Map SQLx errors to the error taxonomy.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                // Unique violation: duplicate business key.
                Some("23505") => DomainError::conflict(msg).into(),
                // Foreign key violation: dangling SKU/location reference.
                Some("23503") => DomainError::validation(msg).into(),
                // Check constraint violation: invalid stored value.
                Some("23514") => DomainError::validation(msg).into(),
                _ => StoreError::Storage(msg),
            }
        }
        other => StoreError::Storage(format!("sqlx error in {operation}: {other}")),
    }
}

// SQLx row types

#[derive(Debug)]
struct BalanceRowSql {
    sku_num: String,
    description: String,
    row_code: String,
    bay_num: String,
    level_code: String,
    side: String,
    on_hand: i64,
}

impl<'r> FromRow<'r, PgRow> for BalanceRowSql {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(BalanceRowSql {
            sku_num: row.try_get("sku_num")?,
            description: row.try_get("description")?,
            row_code: row.try_get("row_code")?,
            bay_num: row.try_get("bay_num")?,
            level_code: row.try_get("level_code")?,
            side: row.try_get("side")?,
            on_hand: row.try_get("on_hand")?,
        })
    }
}

#[derive(Debug)]
struct NativeDetailRow {
    id: i64,
    sku_num: String,
    row_code: String,
    bay_num: String,
    level_code: String,
    side: String,
    movement_type: String,
    quantity_change: i64,
    reference: String,
    user_id: i64,
    created_at: DateTime<Utc>,
    running_balance: i64,
}

impl<'r> FromRow<'r, PgRow> for NativeDetailRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(NativeDetailRow {
            id: row.try_get("id")?,
            sku_num: row.try_get("sku_num")?,
            row_code: row.try_get("row_code")?,
            bay_num: row.try_get("bay_num")?,
            level_code: row.try_get("level_code")?,
            side: row.try_get("side")?,
            movement_type: row.try_get("movement_type")?,
            quantity_change: row.try_get("quantity_change")?,
            reference: row.try_get("reference")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
            running_balance: row.try_get("running_balance")?,
        })
    }
}

impl TryFrom<NativeDetailRow> for DetailRow {
    type Error = StoreError;

    fn try_from(row: NativeDetailRow) -> Result<Self, Self::Error> {
        Ok(DetailRow {
            id: MovementId::new(row.id),
            sku_num: row.sku_num,
            bin_code: bin_code(&row.row_code, &row.bay_num, &row.level_code, &row.side),
            movement_type: parse_movement_type(&row.movement_type)?,
            quantity_change: row.quantity_change,
            reference: row.reference,
            user_id: UserId::new(row.user_id),
            created_at: row.created_at,
            running_balance: row.running_balance,
        })
    }
}

#[derive(Debug)]
struct FallbackDetailRow {
    id: i64,
    sku_id: i64,
    loc_id: i64,
    sku_num: String,
    row_code: String,
    bay_num: String,
    level_code: String,
    side: String,
    movement_type: String,
    quantity_change: i64,
    reference: String,
    user_id: i64,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for FallbackDetailRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(FallbackDetailRow {
            id: row.try_get("id")?,
            sku_id: row.try_get("sku_id")?,
            loc_id: row.try_get("loc_id")?,
            sku_num: row.try_get("sku_num")?,
            row_code: row.try_get("row_code")?,
            bay_num: row.try_get("bay_num")?,
            level_code: row.try_get("level_code")?,
            side: row.try_get("side")?,
            movement_type: row.try_get("movement_type")?,
            quantity_change: row.try_get("quantity_change")?,
            reference: row.try_get("reference")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("A1"), "%A1%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("A_B"), "%A\\_B%");
        assert_eq!(like_pattern("C\\D"), "%C\\\\D%");
    }

    #[test]
    fn bin_code_composes_at_read_time() {
        assert_eq!(bin_code("R10", "1", "11", "FRONT"), "R10-1-11-FRONT");
    }
}
