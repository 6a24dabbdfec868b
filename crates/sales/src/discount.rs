use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopkeep_core::{Money, ValueObject};

use crate::pricing::PricingError;

/// Discount applied to a cart's subtotal.
///
/// The resulting discount amount never exceeds the subtotal: a percentage is
/// bounded by its `0..=100` range and a fixed amount is capped at the subtotal.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DiscountSpec {
    #[default]
    None,
    /// Percentage of the subtotal, `0..=100`.
    Percent(Decimal),
    /// Fixed amount, `>= 0`.
    Fixed(Money),
}

impl ValueObject for DiscountSpec {}

impl DiscountSpec {
    pub fn percent(value: Decimal) -> Result<Self, PricingError> {
        let spec = Self::Percent(value);
        spec.validate()?;
        Ok(spec)
    }

    pub fn fixed(amount: Money) -> Result<Self, PricingError> {
        let spec = Self::Fixed(amount);
        spec.validate()?;
        Ok(spec)
    }

    /// Deserialized specs bypass the constructors; callers validate before use.
    pub fn validate(&self) -> Result<(), PricingError> {
        match self {
            DiscountSpec::None => Ok(()),
            DiscountSpec::Percent(p) => {
                if *p < Decimal::ZERO || *p > Decimal::ONE_HUNDRED {
                    Err(PricingError::InvalidDiscount(format!(
                        "percent must be within 0..=100, got {p}"
                    )))
                } else {
                    Ok(())
                }
            }
            DiscountSpec::Fixed(amount) => {
                if amount.is_negative() {
                    Err(PricingError::InvalidDiscount(format!(
                        "fixed discount cannot be negative, got {amount}"
                    )))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Discount amount for `subtotal`, always within `0..=subtotal`.
    pub fn amount_for(&self, subtotal: Money) -> Result<Money, PricingError> {
        let raw = match self {
            DiscountSpec::None => Money::ZERO,
            DiscountSpec::Percent(p) => subtotal
                .checked_percent(*p)
                .ok_or(PricingError::AmountOverflow)?,
            DiscountSpec::Fixed(amount) => *amount,
        };
        Ok(raw.min(subtotal).floor_zero())
    }
}
