//! Basis points - 1/10_000, the fixed-point scale for all percentages

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::amount::Amount;
use crate::math::{mul_div_floor, BPS_SCALE};

/// A percentage expressed in basis points (10_000 = 100%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bps(u32);

impl Bps {
    pub const ZERO: Self = Self(0);

    /// 100%
    pub const ONE: Self = Self(BPS_SCALE as u32);

    #[inline]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn value(&self) -> u32 {
        self.0
    }

    #[inline]
    pub fn as_u128(&self) -> u128 {
        self.0 as u128
    }

    /// `amount * self / 10_000`, floored. `None` on overflow.
    pub fn apply(&self, amount: Amount) -> Option<Amount> {
        mul_div_floor(amount.units(), self.as_u128(), BPS_SCALE).map(Amount::new)
    }

    /// Exact fraction, e.g. 1200 bps -> 0.12
    pub fn as_decimal(&self) -> Decimal {
        Decimal::new(i64::from(self.0), 4)
    }

    /// Saturating conversion from a wide intermediate
    pub fn saturating_from(value: u128) -> Self {
        Self(u32::try_from(value).unwrap_or(u32::MAX))
    }
}

impl fmt::Display for Bps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bps", self.0)
    }
}

impl From<u32> for Bps {
    fn from(value: u32) -> Self {
        Self(value)
    }
}
