use serde::{Deserialize, Serialize};

use shopkeep_core::{Money, ValueObject};

use crate::pricing::PricingError;

/// Shipping tier chosen for a cart.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tier", content = "fee", rename_all = "snake_case")]
pub enum ShippingSelection {
    #[serde(rename = "fee_7")]
    Fee7,
    #[serde(rename = "fee_10")]
    Fee10,
    #[default]
    Free,
    /// Arbitrary non-negative fee.
    Custom(Money),
}

impl ValueObject for ShippingSelection {}

impl ShippingSelection {
    pub fn custom(fee: Money) -> Result<Self, PricingError> {
        let selection = Self::Custom(fee);
        selection.validate()?;
        Ok(selection)
    }

    pub fn validate(&self) -> Result<(), PricingError> {
        match self {
            ShippingSelection::Custom(fee) if fee.is_negative() => {
                Err(PricingError::InvalidShippingFee(*fee))
            }
            _ => Ok(()),
        }
    }

    pub fn fee(&self) -> Money {
        match self {
            ShippingSelection::Fee7 => Money::from_major(7),
            ShippingSelection::Fee10 => Money::from_major(10),
            ShippingSelection::Free => Money::ZERO,
            ShippingSelection::Custom(fee) => *fee,
        }
    }
}
