//! Pool aggregates and interest accrual
//!
//! Interest is simple interest on `total_borrows` over the elapsed time,
//! split between suppliers (credited to `total_deposits`) and the protocol.

use bilend_core::{Amount, Bps, Timestamp, BPS_SCALE, SECONDS_PER_YEAR};
use bilend_rate::{utilization, RateModel};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LedgerError;

/// Global pool singleton
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolState {
    pub total_deposits: Amount,
    pub total_borrows: Amount,
    /// Accrued, unswept protocol revenue
    pub protocol_fees: Amount,
    /// Never decreases
    pub last_accrual_time: Timestamp,
}

/// Figures produced by one accrual step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccrualOutcome {
    pub timestamp: Timestamp,
    pub elapsed: u64,
    pub borrow_rate: Bps,
    pub supply_rate: Bps,
    pub interest: Amount,
    pub protocol_share: Amount,
    pub supplier_share: Amount,
}

impl PoolState {
    /// Fresh pool created at `now` with all aggregates zero
    pub fn new(now: Timestamp) -> Self {
        Self {
            last_accrual_time: now,
            ..Self::default()
        }
    }

    /// `total_deposits - total_borrows`, zero if borrows exceed deposits
    pub fn free_liquidity(&self) -> Amount {
        self.total_deposits.saturating_sub(self.total_borrows)
    }

    pub fn utilization(&self) -> Bps {
        utilization(self.total_borrows, self.total_deposits)
    }

    /// Advance interest bookkeeping to `now`.
    ///
    /// Returns `Ok(None)` when no time has elapsed (including a clock reading
    /// earlier than the last accrual); the pool is left untouched in that case.
    pub fn accrue(
        &mut self,
        now: Timestamp,
        model: &RateModel,
        protocol_fee: Bps,
    ) -> Result<Option<AccrualOutcome>, LedgerError> {
        let elapsed = now.saturating_sub(self.last_accrual_time);
        if elapsed == 0 {
            return Ok(None);
        }

        let utilization = self.utilization();
        let borrow_rate = model.borrow_rate(utilization);
        let supply_rate = model.supply_rate(utilization, protocol_fee);

        let interest = self
            .total_borrows
            .units()
            .checked_mul(borrow_rate.as_u128())
            .and_then(|v| v.checked_mul(u128::from(elapsed)))
            .map(|v| v / (SECONDS_PER_YEAR * BPS_SCALE))
            .map(Amount::new)
            .ok_or(LedgerError::MathOverflow("interest"))?;

        let protocol_share = protocol_fee
            .apply(interest)
            .ok_or(LedgerError::MathOverflow("protocol share"))?;
        let supplier_share = interest
            .checked_sub(protocol_share)
            .ok_or(LedgerError::MathOverflow("supplier share"))?;

        let total_borrows = self
            .total_borrows
            .checked_add(interest)
            .ok_or(LedgerError::MathOverflow("total borrows"))?;
        let total_deposits = self
            .total_deposits
            .checked_add(supplier_share)
            .ok_or(LedgerError::MathOverflow("total deposits"))?;
        let protocol_fees = self
            .protocol_fees
            .checked_add(protocol_share)
            .ok_or(LedgerError::MathOverflow("protocol fees"))?;

        *self = PoolState {
            total_deposits,
            total_borrows,
            protocol_fees,
            last_accrual_time: now,
        };

        debug!(
            elapsed,
            %borrow_rate,
            %supply_rate,
            %interest,
            %protocol_share,
            "Interest accrued"
        );

        Ok(Some(AccrualOutcome {
            timestamp: now,
            elapsed,
            borrow_rate,
            supply_rate,
            interest,
            protocol_share,
            supplier_share,
        }))
    }
}
