//! Interest rate formulas
//!
//! All inputs and outputs are basis points. Rates are annualized.

use bilend_core::{Amount, Bps, BPS_SCALE};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Selectable rate formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum RateModelKind {
    /// `base + u * multiplier`
    #[default]
    Linear,

    /// Linear up to the kink, then `jump_multiplier` on the excess
    Kink,

    /// `base + u^2 * multiplier`
    Exponential,
}

/// The four immutable parameters shared by every formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateModelParams {
    pub base_rate: Bps,
    pub multiplier: Bps,
    pub jump_multiplier: Bps,
    pub kink: Bps,
}

impl Default for RateModelParams {
    fn default() -> Self {
        Self {
            base_rate: Bps::new(200),
            multiplier: Bps::new(2_000),
            jump_multiplier: Bps::new(10_000),
            kink: Bps::new(8_000),
        }
    }
}

/// Pool utilization: `borrowed * 10_000 / supplied`.
///
/// An empty pool reports 0% rather than failing. Not clamped at 100%.
pub fn utilization(borrowed: Amount, supplied: Amount) -> Bps {
    if supplied.is_zero() {
        return Bps::ZERO;
    }
    let scaled = borrowed
        .units()
        .checked_mul(BPS_SCALE)
        .map(|v| v / supplied.units())
        // borrowed * 10_000 only overflows for absurd balances; fall back to
        // dividing first, which loses precision but not magnitude
        .unwrap_or_else(|| (borrowed.units() / supplied.units()).saturating_mul(BPS_SCALE));
    Bps::saturating_from(scaled)
}

/// Interest rate model: a selected formula over fixed parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RateModel {
    kind: RateModelKind,
    params: RateModelParams,
}

impl RateModel {
    pub fn new(kind: RateModelKind, params: RateModelParams) -> Self {
        Self { kind, params }
    }

    pub fn kind(&self) -> RateModelKind {
        self.kind
    }

    pub fn params(&self) -> &RateModelParams {
        &self.params
    }

    /// Switch the active formula. Parameters are untouched.
    pub fn set_kind(&mut self, kind: RateModelKind) {
        self.kind = kind;
    }

    /// Annualized borrow rate for the given utilization
    pub fn borrow_rate(&self, utilization: Bps) -> Bps {
        let u = utilization.as_u128();
        let p = &self.params;
        let base = p.base_rate.as_u128();

        let rate = match self.kind {
            RateModelKind::Linear => base.saturating_add(slope(u, p.multiplier)),
            RateModelKind::Kink => {
                let kink = p.kink.as_u128();
                if u <= kink {
                    base.saturating_add(slope(u, p.multiplier))
                } else {
                    base.saturating_add(slope(kink, p.multiplier))
                        .saturating_add(slope(u - kink, p.jump_multiplier))
                }
            }
            RateModelKind::Exponential => {
                let squared = u.saturating_mul(u);
                base.saturating_add(
                    squared.saturating_mul(p.multiplier.as_u128()) / (BPS_SCALE * BPS_SCALE),
                )
            }
        };

        Bps::saturating_from(rate)
    }

    /// Borrow rate for a pool with the given aggregates
    pub fn borrow_rate_for(&self, borrowed: Amount, supplied: Amount) -> Bps {
        self.borrow_rate(utilization(borrowed, supplied))
    }

    /// Rate earned by suppliers after the protocol's cut.
    ///
    /// `borrow_rate * utilization * (1 - protocol_fee)`, floored at each step.
    pub fn supply_rate(&self, utilization: Bps, protocol_fee: Bps) -> Bps {
        let borrow = self.borrow_rate(utilization).as_u128();
        let gross = borrow.saturating_mul(utilization.as_u128()) / BPS_SCALE;
        let kept = BPS_SCALE.saturating_sub(protocol_fee.as_u128());
        Bps::saturating_from(gross.saturating_mul(kept) / BPS_SCALE)
    }
}

#[inline]
fn slope(u: u128, multiplier: Bps) -> u128 {
    u.saturating_mul(multiplier.as_u128()) / BPS_SCALE
}
