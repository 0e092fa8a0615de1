//! Fixed-point helpers
//!
//! Every calculation in BiLend is integer arithmetic rounded toward zero.
//! Helpers return `None` instead of wrapping so callers can surface overflow.

/// Seconds since the Unix epoch
pub type Timestamp = u64;

/// 10_000 bps = 100%
pub const BPS_SCALE: u128 = 10_000;

/// 365 days, no leap years
pub const SECONDS_PER_YEAR: u128 = 365 * 86_400;

/// Compute `floor(a * b / denom)`.
///
/// Returns `None` if the intermediate product overflows or `denom` is zero.
#[inline]
pub fn mul_div_floor(a: u128, b: u128, denom: u128) -> Option<u128> {
    if denom == 0 {
        return None;
    }
    a.checked_mul(b).map(|product| product / denom)
}

/// Compute `ceil(a * b / denom)`, the smallest `x` with `x * denom >= a * b`.
#[inline]
pub fn mul_div_ceil(a: u128, b: u128, denom: u128) -> Option<u128> {
    if denom == 0 {
        return None;
    }
    let product = a.checked_mul(b)?;
    let quotient = product / denom;
    if product % denom == 0 {
        Some(quotient)
    } else {
        quotient.checked_add(1)
    }
}
