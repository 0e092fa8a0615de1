//! Asset transfer capability
//!
//! The ledger only does bookkeeping; moving the asset in and out of the pool
//! is delegated to an `AssetTransfer` implementation.

use bilend_core::{Address, Amount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::TransferError;

/// Moves the pool asset between holders and the pool
///
/// Implementations must be able to pay back a `transfer_in` they have just
/// accepted: a liquidation whose payout fails returns the liquidator's
/// payment with `transfer_out`. If that refund fails too the ledger reports
/// [`crate::LedgerError::RefundFailed`].
pub trait AssetTransfer {
    /// Pull `amount` from `from` into the pool
    fn transfer_in(&mut self, from: &Address, amount: Amount) -> Result<(), TransferError>;

    /// Pay `amount` out of the pool to `to`
    fn transfer_out(&mut self, to: &Address, amount: Amount) -> Result<(), TransferError>;
}

/// In-memory custody: wallet balances plus the pool's physical holdings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    wallets: BTreeMap<Address, Amount>,
    pool_balance: Amount,
}

impl Vault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fund a wallet from outside the system
    pub fn credit(&mut self, holder: &Address, amount: Amount) -> Result<Amount, TransferError> {
        let current = self.balance_of(holder);
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected(format!("wallet overflow for {}", holder)))?;
        self.wallets.insert(holder.clone(), updated);
        Ok(updated)
    }

    pub fn balance_of(&self, holder: &Address) -> Amount {
        self.wallets.get(holder).copied().unwrap_or(Amount::ZERO)
    }

    /// Asset physically held by the pool
    pub fn pool_balance(&self) -> Amount {
        self.pool_balance
    }
}

impl AssetTransfer for Vault {
    fn transfer_in(&mut self, from: &Address, amount: Amount) -> Result<(), TransferError> {
        let available = self.balance_of(from);
        let remaining = available
            .checked_sub(amount)
            .ok_or_else(|| TransferError::InsufficientFunds {
                holder: from.clone(),
                available,
                required: amount,
            })?;
        let pool_balance = self
            .pool_balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected("pool balance overflow".to_string()))?;

        if remaining.is_zero() {
            self.wallets.remove(from);
        } else {
            self.wallets.insert(from.clone(), remaining);
        }
        self.pool_balance = pool_balance;
        Ok(())
    }

    fn transfer_out(&mut self, to: &Address, amount: Amount) -> Result<(), TransferError> {
        let pool_balance = self.pool_balance.checked_sub(amount).ok_or(
            TransferError::PoolInsufficientFunds {
                available: self.pool_balance,
                required: amount,
            },
        )?;
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected(format!("wallet overflow for {}", to)))?;

        self.pool_balance = pool_balance;
        self.wallets.insert(to.clone(), credited);
        Ok(())
    }
}
