//! Ledger errors
//!
//! Every error is raised before the staged state is committed, so a failed
//! operation leaves the ledger untouched.

use bilend_core::{Address, Amount, Bps};
use thiserror::Error;

/// Errors from the asset-transfer collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Insufficient funds for {holder}: available {available}, required {required}")]
    InsufficientFunds {
        holder: Address,
        available: Amount,
        required: Amount,
    },

    #[error("Pool balance too low: available {available}, required {required}")]
    PoolInsufficientFunds { available: Amount, required: Amount },

    #[error("Transfer rejected: {0}")]
    Rejected(String),
}

/// Errors that can occur in ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid amount {amount}: {reason}")]
    InvalidAmount { amount: Amount, reason: &'static str },

    #[error("Insufficient balance for {account}: available {available}, required {required}")]
    InsufficientBalance {
        account: Address,
        available: Amount,
        required: Amount,
    },

    #[error("Collateral {collateral} does not cover debt {debt} at {required}")]
    InvalidCollateralRatio {
        collateral: Amount,
        debt: Amount,
        required: Bps,
    },

    /// Liquidation attempted on a position that is not eligible yet
    #[error("Position of {user} is not liquidatable: health factor {health_factor} bps")]
    PositionHealthy { user: Address, health_factor: u128 },

    #[error("Collateral of {user} too low to cover seizure: available {available}, required {required}")]
    InsufficientCollateral {
        user: Address,
        available: Amount,
        required: Amount,
    },

    #[error("{0} cannot liquidate their own position")]
    SelfLiquidation(Address),

    #[error("{0} is not authorized for this operation")]
    Unauthorized(Address),

    #[error("Ledger is paused")]
    Paused,

    #[error("Re-entrant ledger call rejected")]
    Reentrant,

    #[error("Arithmetic overflow in {0}")]
    MathOverflow(&'static str),

    #[error("Transfer failed: {0}")]
    Transfer(#[from] TransferError),

    /// Liquidation payout failed and the liquidator's payment could not be returned.
    /// The collaborator still holds `amount` from the liquidator.
    #[error("Refund of {amount} to {liquidator} failed ({refund}) after payout failed ({payout})")]
    RefundFailed {
        liquidator: Address,
        amount: Amount,
        payout: TransferError,
        refund: TransferError,
    },

    #[error("Ledger lock poisoned")]
    LockPoisoned,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
