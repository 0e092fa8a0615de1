//! Amount - Non-negative integer amount in the asset's smallest denomination
//!
//! Amounts are whole units; there is no fractional storage anywhere in BiLend.
//! Serialized as a decimal string so JSON consumers never lose precision.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing amounts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Invalid amount: {0}")]
    InvalidFormat(String),
}

/// A non-negative amount of the pool asset.
///
/// # Example
/// ```
/// use bilend_core::Amount;
///
/// let a = Amount::new(100);
/// let b = Amount::new(30);
/// assert_eq!(a.checked_sub(b), Some(Amount::new(70)));
///
/// // Going below zero is rejected
/// assert!(b.checked_sub(a).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(u128);

impl Amount {
    /// Zero amount constant
    pub const ZERO: Self = Self(0);

    #[inline]
    pub const fn new(units: u128) -> Self {
        Self(units)
    }

    /// Get the raw unit count
    #[inline]
    pub const fn units(&self) -> u128 {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Addition, `None` on overflow
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Subtraction, `None` if the result would be negative
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Subtraction clamped at zero
    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u128> for Amount {
    fn from(units: u128) -> Self {
        Self(units)
    }
}

impl From<Amount> for u128 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s.trim().chars().filter(|c| *c != '_').collect();
        cleaned
            .parse::<u128>()
            .map(Amount)
            .map_err(|_| AmountError::InvalidFormat(s.to_string()))
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.0.to_string()
    }
}
