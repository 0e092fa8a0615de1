//! Address - Validated account identifier
//!
//! User ids are normalized to upper case so `alice` and `ALICE` name the
//! same account.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const MAX_LEN: usize = 64;

/// Errors that can occur when parsing addresses
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Empty address")]
    Empty,

    #[error("Address too long (max 64 chars): {0}")]
    TooLong(String),

    #[error("Invalid address format: {0}")]
    InvalidFormat(String),
}

/// Identity of a ledger participant
///
/// # Examples
/// ```
/// use bilend_core::Address;
///
/// let alice: Address = "alice".parse().unwrap();
/// assert_eq!(alice.as_str(), "ALICE");
///
/// assert!("bad address".parse::<Address>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Create an Address without validation.
    ///
    /// # Safety
    /// The caller MUST pass an already-normalized id (upper case, valid chars).
    /// Use only for compile-time defaults.
    pub fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_uppercase();

        if s.is_empty() {
            return Err(AddressError::Empty);
        }

        if s.len() > MAX_LEN {
            return Err(AddressError::TooLong(s));
        }

        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(AddressError::InvalidFormat(s));
        }

        Ok(Address(s))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl TryFrom<&str> for Address {
    type Error = AddressError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}
