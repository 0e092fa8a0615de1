//! Per-user position
//!
//! Accounts exist implicitly: a missing entry reads as the zero account.
//! The deposit doubles as collateral (single-asset model).

use bilend_core::{mul_div_floor, Amount, Bps, BPS_SCALE};
use serde::{Deserialize, Serialize};

/// Health factor reported for a position with no debt
pub const HEALTH_FACTOR_MAX: u128 = u128::MAX;

/// A user's principal deposit and outstanding borrow, in asset units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Account {
    pub principal_deposit: Amount,
    pub principal_borrow: Amount,
}

impl Account {
    pub fn new(principal_deposit: Amount, principal_borrow: Amount) -> Self {
        Self {
            principal_deposit,
            principal_borrow,
        }
    }

    /// A zero account is indistinguishable from a never-seen one
    pub fn is_empty(&self) -> bool {
        self.principal_deposit.is_zero() && self.principal_borrow.is_zero()
    }

    /// `collateral * 10_000 / borrow`, or `HEALTH_FACTOR_MAX` with no debt.
    ///
    /// Lower is riskier.
    pub fn health_factor(&self) -> u128 {
        if self.principal_borrow.is_zero() {
            return HEALTH_FACTOR_MAX;
        }
        mul_div_floor(
            self.principal_deposit.units(),
            BPS_SCALE,
            self.principal_borrow.units(),
        )
        .unwrap_or(HEALTH_FACTOR_MAX)
    }

    /// Whether `collateral * 10_000 >= debt * ratio`.
    ///
    /// Returns `None` on overflow.
    pub fn covers(collateral: Amount, debt: Amount, ratio: Bps) -> Option<bool> {
        let lhs = collateral.units().checked_mul(BPS_SCALE)?;
        let rhs = debt.units().checked_mul(ratio.as_u128())?;
        Some(lhs >= rhs)
    }
}
