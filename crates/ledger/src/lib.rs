//! BiLend Ledger - Single-asset collateralized lending
//!
//! This is the HEART of BiLend. Every balance change goes through `Ledger`.
//!
//! # Key Types
//! - `Ledger`: Pool aggregates + accounts, exposes deposit/withdraw/borrow/repay/liquidate
//! - `PoolState`: Global aggregates and the accrual step
//! - `Account`: Per-user principal deposit and borrow
//! - `SharedLedger`: Mutex-guarded handle for concurrent callers
//! - `AssetTransfer` / `Clock`: External collaborators

pub mod account;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod pool;
pub mod shared;
pub mod snapshot;
pub mod transfer;

pub use account::{Account, HEALTH_FACTOR_MAX};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LedgerConfig;
pub use engine::Ledger;
pub use error::{LedgerError, TransferError};
pub use event::LedgerEvent;
pub use pool::{AccrualOutcome, PoolState};
pub use shared::SharedLedger;
pub use snapshot::LedgerSnapshot;
pub use transfer::{AssetTransfer, Vault};
