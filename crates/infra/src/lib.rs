//! Infrastructure layer: storage, configuration, and the collaborator-facing
//! service facade.

pub mod config;
pub mod service;
pub mod store;


pub use config::{ConfigError, DatabaseConfig, database_url};
pub use service::{BalanceList, MovementDetail, WarehouseService};
pub use store::{
    BalancePage, BalanceRow, DetailRow, DetailStrategy, InMemoryLedgerStore, LedgerStore,
    PostgresLedgerStore, StoreError,
};
