//! `stockbook-warehouse` — the warehouse inventory domain.
//!
//! Pure, deterministic model of the movement ledger: SKUs, bin locations,
//! movements with their sign convention, balance folding, running-balance
//! accumulation, pagination math, and the receiving queue state machine.
//! No IO; storage lives in `stockbook-infra`.

pub mod balance;
pub mod location;
pub mod movement;
pub mod page;
pub mod receiving;
pub mod sku;

pub use balance::{BalanceKey, RunningBalances, fold_balances, running_trace};
pub use location::{Location, validate_location_parts};
pub use movement::{Movement, MovementType, NewMovement};
pub use page::{MAX_PAGE_SIZE, Page};
pub use receiving::{NewReceipt, QueueEntry, QueueStatus};
pub use sku::{Sku, SkuStatus, validate_sku_num};
