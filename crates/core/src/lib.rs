//! BiLend Core - Domain types
//!
//! This crate contains the fundamental types used across BiLend:
//! - `Amount`: Non-negative integer amount in the asset's smallest unit
//! - `Bps`: Basis points, the fixed-point scale for every percentage
//! - `Address`: Validated account identifier
//! - `math`: Floor-rounded, overflow-checked integer helpers

pub mod address;
pub mod amount;
pub mod bps;
pub mod math;

pub use address::{Address, AddressError};
pub use amount::{Amount, AmountError};
pub use bps::Bps;
pub use math::{mul_div_ceil, mul_div_floor, Timestamp, BPS_SCALE, SECONDS_PER_YEAR};
