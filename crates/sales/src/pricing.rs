//! Invoice arithmetic: flat discount, then tax on the discounted amount.

use serde::{Deserialize, Serialize};

use shopledger_core::{Decimal, DomainError, DomainResult, Money, ValueObject, out_of_range};

/// Fractional tax rate, e.g. `0.18` for 18% GST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate(Decimal);

impl ValueObject for TaxRate {}

impl TaxRate {
    /// Standard 18% GST.
    pub const GST: TaxRate = TaxRate(Decimal::from_parts(18, 0, 0, false, 2));

    pub fn new(rate: Decimal) -> DomainResult<Self> {
        if rate.is_sign_negative() {
            return Err(DomainError::validation("tax rate cannot be negative"));
        }
        Ok(Self(rate))
    }

    pub fn value(self) -> Decimal {
        self.0
    }
}

/// Frozen invoice amounts of a sales order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub taxable_amount: Money,
    pub tax_amount: Money,
    pub total: Money,
}

impl SalesTotals {
    /// `total = (subtotal - discount) * (1 + rate)`.
    ///
    /// The discount is not clamped: a discount above the subtotal yields a
    /// negative taxable amount. Amounts past the decimal range are refused.
    pub fn compute(subtotal: Money, discount: Money, rate: TaxRate) -> DomainResult<Self> {
        let taxable_amount = subtotal
            .checked_sub(discount)
            .ok_or_else(|| out_of_range("taxable amount"))?;
        let tax_amount = taxable_amount
            .checked_mul(rate.value())
            .ok_or_else(|| out_of_range("tax amount"))?;
        let total = taxable_amount
            .checked_add(tax_amount)
            .ok_or_else(|| out_of_range("order total"))?;
        Ok(Self {
            subtotal,
            discount,
            taxable_amount,
            tax_amount,
            total,
        })
    }
}
