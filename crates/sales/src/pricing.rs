//! Pricing engine.
//!
//! Pure functions of `(line totals, discount, shipping, payment)`. Every amount goes
//! through [`Money`], so identical inputs always produce identical results.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use shopkeep_catalog::Product;
use shopkeep_core::{Money, ValueObject};

use crate::discount::DiscountSpec;
use crate::payment::PaymentMethod;
use crate::shipping::ShippingSelection;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("paid amount {paid} is less than the total {total}")]
    PaymentAmountInsufficient { paid: Money, total: Money },

    #[error("invalid discount: {0}")]
    InvalidDiscount(String),

    #[error("shipping fee cannot be negative, got {0}")]
    InvalidShippingFee(Money),

    #[error("amount exceeds the representable range")]
    AmountOverflow,
}

/// Totals for a cart or order.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingResult {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub shipping_fee: Money,
    pub total: Money,
    /// Cash only: `paid_amount - total`.
    pub change: Option<Money>,
}

impl ValueObject for PricingResult {}

impl PricingResult {
    /// Settle against a payment method, computing change for cash.
    pub fn settle(mut self, payment: &PaymentMethod) -> Result<Self, PricingError> {
        self.change = change_for(payment, self.total)?;
        Ok(self)
    }
}

/// Promotional price if active, otherwise list price.
pub fn effective_unit_price(product: &Product) -> Money {
    product.effective_unit_price()
}

/// `unit_price * quantity`, or `AmountOverflow`.
pub fn line_total(unit_price: Money, quantity: u32) -> Result<Money, PricingError> {
    unit_price
        .checked_times(quantity)
        .ok_or(PricingError::AmountOverflow)
}

/// Totals without settlement (no change computed).
pub fn quote<I>(
    line_totals: I,
    discount: &DiscountSpec,
    shipping: &ShippingSelection,
) -> Result<PricingResult, PricingError>
where
    I: IntoIterator<Item = Money>,
{
    let subtotal = Money::checked_sum(line_totals).ok_or(PricingError::AmountOverflow)?;
    let discount_amount = discount.amount_for(subtotal)?;
    let shipping_fee = shipping.fee();
    // discount_amount <= subtotal, so only the shipping addition can overflow
    let total = (subtotal - discount_amount)
        .checked_add(shipping_fee)
        .ok_or(PricingError::AmountOverflow)?
        .floor_zero();

    Ok(PricingResult {
        subtotal,
        discount_amount,
        shipping_fee,
        total,
        change: None,
    })
}

/// Full pricing including settlement against `payment`.
pub fn price<I>(
    line_totals: I,
    discount: &DiscountSpec,
    shipping: &ShippingSelection,
    payment: &PaymentMethod,
) -> Result<PricingResult, PricingError>
where
    I: IntoIterator<Item = Money>,
{
    quote(line_totals, discount, shipping)?.settle(payment)
}

/// `Some(paid - total)` for cash, `None` for other methods.
pub fn change_for(payment: &PaymentMethod, total: Money) -> Result<Option<Money>, PricingError> {
    match payment.paid_amount() {
        None => Ok(None),
        Some(paid) if paid < total => Err(PricingError::PaymentAmountInsufficient { paid, total }),
        Some(paid) => Ok(Some(paid - total)),
    }
}
