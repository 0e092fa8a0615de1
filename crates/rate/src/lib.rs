//! BiLend Rate Model
//!
//! Pure mapping from pool utilization to an annualized borrow rate.
//! The ledger feeds in `(total_borrows, total_deposits)`; the model never
//! reads or mutates ledger state.

pub mod model;

pub use model::{utilization, RateModel, RateModelKind, RateModelParams};
