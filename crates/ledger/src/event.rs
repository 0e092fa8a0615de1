//! Observable ledger events
//!
//! One event per successful state change, never on failure. Accrual adds an
//! `InterestAccrued` event ahead of the operation's own event when time has
//! elapsed.

use bilend_core::{Address, Amount, Bps, Timestamp};
use bilend_rate::RateModelKind;
use serde::{Deserialize, Serialize};

use crate::pool::AccrualOutcome;

/// Events emitted by the lending ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum LedgerEvent {
    InterestAccrued {
        timestamp: Timestamp,
        borrow_rate_bps: Bps,
        supply_rate_bps: Bps,
        interest: Amount,
        protocol_share: Amount,
    },

    Deposited { actor: Address, amount: Amount },

    Withdrawn { actor: Address, amount: Amount },

    Borrowed { actor: Address, amount: Amount },

    Repaid { actor: Address, amount: Amount },

    Liquidated {
        liquidator: Address,
        borrower: Address,
        /// Debt repaid by the liquidator
        amount: Amount,
        /// Extra collateral paid to the liquidator on top of `amount`
        bonus: Amount,
    },

    ProtocolFeesWithdrawn { recipient: Address, amount: Amount },

    RateModelChanged { actor: Address, kind: RateModelKind },

    Paused { actor: Address },

    Unpaused { actor: Address },
}

impl LedgerEvent {
    pub fn accrued(outcome: &AccrualOutcome) -> Self {
        Self::InterestAccrued {
            timestamp: outcome.timestamp,
            borrow_rate_bps: outcome.borrow_rate,
            supply_rate_bps: outcome.supply_rate,
            interest: outcome.interest,
            protocol_share: outcome.protocol_share,
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::InterestAccrued { .. } => "interest_accrued",
            LedgerEvent::Deposited { .. } => "deposited",
            LedgerEvent::Withdrawn { .. } => "withdrawn",
            LedgerEvent::Borrowed { .. } => "borrowed",
            LedgerEvent::Repaid { .. } => "repaid",
            LedgerEvent::Liquidated { .. } => "liquidated",
            LedgerEvent::ProtocolFeesWithdrawn { .. } => "protocol_fees_withdrawn",
            LedgerEvent::RateModelChanged { .. } => "rate_model_changed",
            LedgerEvent::Paused { .. } => "paused",
            LedgerEvent::Unpaused { .. } => "unpaused",
        }
    }
}
