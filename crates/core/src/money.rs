//! Monetary amounts and stock quantities.
//!
//! Both are exact decimals: quantities may be fractional (kilograms, metres)
//! and tax is applied as a fractional rate, so binary floats are not used.

pub use rust_decimal::Decimal;

use crate::error::{DomainError, DomainResult};

/// Currency amount (no currency code; a deployment has exactly one).
pub type Money = Decimal;

/// Stock quantity, possibly fractional.
pub type Quantity = Decimal;

/// Error for an amount that does not fit the decimal range.
pub fn out_of_range(what: impl core::fmt::Display) -> DomainError {
    DomainError::validation(format!("{what} is out of range"))
}

/// `a * b`, refused when the product overflows.
pub fn checked_product(
    a: Decimal,
    b: Decimal,
    what: impl core::fmt::Display,
) -> DomainResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| out_of_range(what))
}

/// Sum of `values`, refused when any partial sum overflows.
pub fn checked_sum(
    values: impl IntoIterator<Item = Decimal>,
    what: impl core::fmt::Display,
) -> DomainResult<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or_else(|| out_of_range(what))
}
