//! Cart aggregate.
//!
//! A cart lives for one session. Every mutation goes through its methods, which
//! recompute the pricing and return the fresh [`PricingResult`]. Stock checks here
//! use the stock reading taken when the product was added and are advisory only;
//! the authoritative check happens when the order is confirmed.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use shopkeep_catalog::{Product, ProductId};
use shopkeep_core::{ClientId, Money};

use crate::discount::DiscountSpec;
use crate::order::{Order, OrderDraft, OrderLine};
use crate::payment::PaymentMethod;
use crate::pricing::{self, PricingError, PricingResult};
use crate::shipping::ShippingSelection;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub product_name: String,
    /// Effective price when the line was created or last re-priced.
    pub unit_price: Money,
    pub quantity: u32,
    /// Stock known at the last catalog read.
    pub known_stock: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    #[error("quantity must be positive")]
    InvalidQuantity,

    #[error("quantity {requested} for product {product_id} exceeds known stock {available}")]
    StockExceeded {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    #[error("product {0} is not in the cart")]
    LineNotFound(ProductId),

    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// A checkout precondition that is not met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingCondition {
    Client,
    Lines,
    PaymentMethod,
}

impl core::fmt::Display for MissingCondition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            MissingCondition::Client => "client",
            MissingCondition::Lines => "lines",
            MissingCondition::PaymentMethod => "payment_method",
        })
    }
}

fn describe_missing(missing: &[MissingCondition]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum CheckoutError<E> {
    #[error("checkout not ready, missing: {}", describe_missing(.0))]
    NotReady(Vec<MissingCondition>),

    #[error(transparent)]
    Payment(PricingError),

    #[error("order placement failed: {0}")]
    Placement(#[source] E),
}

/// Persists a cart snapshot as a pending order.
pub trait OrderPlacement {
    type Error;

    fn place(&self, draft: OrderDraft) -> Result<Order, Self::Error>;
}

impl<P> OrderPlacement for &P
where
    P: OrderPlacement + ?Sized,
{
    type Error = P::Error;

    fn place(&self, draft: OrderDraft) -> Result<Order, Self::Error> {
        (**self).place(draft)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    client_id: Option<ClientId>,
    lines: Vec<CartLine>,
    discount: DiscountSpec,
    shipping: ShippingSelection,
    payment: Option<PaymentMethod>,
    pricing: PricingResult,
    payment_shortfall: Option<PricingError>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product_id == product_id)
    }

    pub fn discount(&self) -> &DiscountSpec {
        &self.discount
    }

    pub fn shipping(&self) -> &ShippingSelection {
        &self.shipping
    }

    pub fn payment(&self) -> Option<&PaymentMethod> {
        self.payment.as_ref()
    }

    /// Latest cached pricing.
    pub fn pricing(&self) -> &PricingResult {
        &self.pricing
    }

    /// Set when a cash payment no longer covers the total after a later change.
    pub fn payment_shortfall(&self) -> Option<&PricingError> {
        self.payment_shortfall.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add `quantity` of `product`, merging into an existing line.
    ///
    /// A new line snapshots the effective price. An existing line keeps its price and
    /// takes the fresher stock reading from `product`.
    pub fn add(&mut self, product: &Product, quantity: i64) -> Result<PricingResult, CartError> {
        if quantity <= 0 {
            return Err(CartError::InvalidQuantity);
        }

        let product_id = product.id_typed();
        let existing = self.line(&product_id).map_or(0, |l| i64::from(l.quantity));
        let requested = existing.saturating_add(quantity);
        let qty = checked_quantity(product_id, requested, product.stock())?;

        self.apply(|cart| {
            match cart.lines.iter_mut().find(|l| l.product_id == product_id) {
                Some(line) => {
                    line.quantity = qty;
                    line.known_stock = product.stock();
                }
                None => cart.lines.push(CartLine {
                    product_id,
                    product_name: product.name().to_string(),
                    unit_price: pricing::effective_unit_price(product),
                    quantity: qty,
                    known_stock: product.stock(),
                }),
            }
        })
    }

    /// Set a line's quantity. Zero or less removes the line.
    pub fn update_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<PricingResult, CartError> {
        if quantity <= 0 {
            return self.remove(product_id);
        }

        let line = self
            .line(product_id)
            .ok_or(CartError::LineNotFound(*product_id))?;
        let qty = checked_quantity(*product_id, quantity, line.known_stock)?;

        self.apply(|cart| {
            if let Some(line) = cart.lines.iter_mut().find(|l| &l.product_id == product_id) {
                line.quantity = qty;
            }
        })
    }

    /// Remove a line; absent products are a no-op.
    pub fn remove(&mut self, product_id: &ProductId) -> Result<PricingResult, CartError> {
        self.apply(|cart| cart.lines.retain(|l| &l.product_id != product_id))
    }

    /// Refresh an existing line's price and known stock from a new catalog read.
    pub fn reprice(&mut self, product: &Product) -> Result<PricingResult, CartError> {
        let product_id = product.id_typed();
        let line = self
            .line(&product_id)
            .ok_or(CartError::LineNotFound(product_id))?;
        checked_quantity(product_id, i64::from(line.quantity), product.stock())?;

        self.apply(|cart| {
            if let Some(line) = cart.lines.iter_mut().find(|l| l.product_id == product_id) {
                line.unit_price = pricing::effective_unit_price(product);
                line.known_stock = product.stock();
                line.product_name = product.name().to_string();
            }
        })
    }

    pub fn set_client(&mut self, client_id: ClientId) {
        self.client_id = Some(client_id);
    }

    pub fn set_discount(&mut self, discount: DiscountSpec) -> Result<PricingResult, CartError> {
        discount.validate()?;
        self.apply(|cart| cart.discount = discount)
    }

    pub fn set_shipping(&mut self, shipping: ShippingSelection) -> Result<PricingResult, CartError> {
        shipping.validate()?;
        self.apply(|cart| cart.shipping = shipping)
    }

    /// Set the payment method. Cash that does not cover the current total is
    /// rejected and the previous method is kept.
    pub fn set_payment(&mut self, payment: PaymentMethod) -> Result<PricingResult, CartError> {
        pricing::change_for(&payment, self.pricing.total)?;
        self.apply(|cart| cart.payment = Some(payment))
    }

    /// Unmet checkout preconditions, excluding the cash amount check.
    pub fn missing_conditions(&self) -> Vec<MissingCondition> {
        let mut missing = Vec::new();
        if self.client_id.is_none() {
            missing.push(MissingCondition::Client);
        }
        if self.lines.is_empty() {
            missing.push(MissingCondition::Lines);
        }
        if self.payment.is_none() {
            missing.push(MissingCondition::PaymentMethod);
        }
        missing
    }

    /// Hand the frozen snapshot to `placement`; on success the cart is cleared.
    ///
    /// On any failure the cart is left untouched and no order exists.
    pub fn checkout<P>(&mut self, placement: &P) -> Result<Order, CheckoutError<P::Error>>
    where
        P: OrderPlacement,
    {
        let draft = self.draft()?;
        let order = placement.place(draft).map_err(CheckoutError::Placement)?;

        debug!(order_id = %order.id_typed(), "cart checked out");
        *self = Cart::new();
        Ok(order)
    }

    /// Validate checkout preconditions and build the snapshot.
    pub fn draft<E>(&self) -> Result<OrderDraft, CheckoutError<E>> {
        let missing = self.missing_conditions();
        let (Some(client_id), Some(payment_method), true) =
            (self.client_id, self.payment, missing.is_empty())
        else {
            return Err(CheckoutError::NotReady(missing));
        };
        if let Some(shortfall) = &self.payment_shortfall {
            return Err(CheckoutError::Payment(shortfall.clone()));
        }

        Ok(OrderDraft {
            client_id,
            lines: self
                .lines
                .iter()
                .map(|l| OrderLine {
                    product_id: l.product_id,
                    product_name: l.product_name.clone(),
                    unit_price: l.unit_price,
                    quantity: l.quantity,
                })
                .collect(),
            pricing: self.pricing,
            payment_method,
        })
    }

    /// Run `mutate` on a copy and keep it only if the copy still prices.
    fn apply(&mut self, mutate: impl FnOnce(&mut Cart)) -> Result<PricingResult, CartError> {
        let mut next = self.clone();
        mutate(&mut next);
        let pricing = next.recompute()?;
        *self = next;
        Ok(pricing)
    }

    fn recompute(&mut self) -> Result<PricingResult, PricingError> {
        let line_totals = self
            .lines
            .iter()
            .map(|l| pricing::line_total(l.unit_price, l.quantity))
            .collect::<Result<Vec<_>, _>>()?;
        let quoted = pricing::quote(line_totals, &self.discount, &self.shipping)?;

        self.pricing = quoted;
        self.payment_shortfall = None;
        if let Some(payment) = &self.payment {
            match quoted.settle(payment) {
                Ok(settled) => self.pricing = settled,
                Err(e) => self.payment_shortfall = Some(e),
            }
        }
        Ok(self.pricing)
    }
}

fn checked_quantity(product_id: ProductId, requested: i64, available: i64) -> Result<u32, CartError> {
    if requested > available {
        return Err(CartError::StockExceeded {
            product_id,
            requested,
            available,
        });
    }
    u32::try_from(requested).map_err(|_| CartError::InvalidQuantity)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::order::{OrderCommand, OrderId, OrderStatus, PlaceOrder};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use shopkeep_core::AggregateId;

    fn product(price_cents: i64, promo_cents: Option<i64>, stock: i64) -> Product {
        Product::new(
            ProductId::new(AggregateId::new()),
            "Notebook A5",
            Money::from_minor(price_cents),
            promo_cents.map(Money::from_minor),
            stock,
        )
        .unwrap()
    }

    /// Places orders in memory and remembers the drafts it saw.
    #[derive(Default)]
    struct RecordingPlacement {
        drafts: RefCell<Vec<OrderDraft>>,
        fail: bool,
    }

    impl OrderPlacement for RecordingPlacement {
        type Error = &'static str;

        fn place(&self, draft: OrderDraft) -> Result<Order, Self::Error> {
            if self.fail {
                return Err("store unavailable");
            }
            self.drafts.borrow_mut().push(draft.clone());
            let mut order = Order::empty(OrderId::new(AggregateId::new()));
            let cmd = OrderCommand::PlaceOrder(PlaceOrder {
                order_id: order.id_typed(),
                draft,
                occurred_at: Utc::now(),
            });
            shopkeep_events::execute(&mut order, &cmd).map_err(|_| "rejected")?;
            Ok(order)
        }
    }

    fn ready_cart(p: &Product, qty: i64) -> Cart {
        let mut cart = Cart::new();
        cart.add(p, qty).unwrap();
        cart.set_client(ClientId::new());
        cart.set_payment(PaymentMethod::Pix).unwrap();
        cart
    }

    #[test]
    fn add_snapshots_effective_price() {
        let p = product(2000, Some(1500), 10);
        let mut cart = Cart::new();
        let pricing = cart.add(&p, 2).unwrap();

        assert_eq!(cart.lines()[0].unit_price, Money::from_minor(1500));
        assert_eq!(pricing.subtotal, Money::from_minor(3000));
    }

    #[test]
    fn adding_same_product_merges_lines() {
        let p = product(1000, None, 10);
        let mut cart = Cart::new();
        cart.add(&p, 3).unwrap();
        cart.add(&p, 4).unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 7);
        assert_eq!(cart.pricing().subtotal, Money::from_major(70));
    }

    #[test]
    fn merged_quantity_is_checked_against_stock() {
        let p = product(1000, None, 5);
        let mut cart = Cart::new();
        cart.add(&p, 3).unwrap();

        let err = cart.add(&p, 3).unwrap_err();
        assert_eq!(
            err,
            CartError::StockExceeded {
                product_id: p.id_typed(),
                requested: 6,
                available: 5,
            }
        );
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn add_rejects_non_positive_quantity() {
        let p = product(1000, None, 5);
        let mut cart = Cart::new();
        assert_eq!(cart.add(&p, 0), Err(CartError::InvalidQuantity));
        assert_eq!(cart.add(&p, -2), Err(CartError::InvalidQuantity));
        assert!(cart.is_empty());
    }

    #[test]
    fn update_quantity_to_zero_removes_line() {
        let p = product(1000, None, 5);
        let mut cart = Cart::new();
        cart.add(&p, 2).unwrap();

        let pricing = cart.update_quantity(&p.id_typed(), 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(pricing.subtotal, Money::ZERO);
    }

    #[test]
    fn update_quantity_revalidates_known_stock() {
        let p = product(1000, None, 5);
        let mut cart = Cart::new();
        cart.add(&p, 2).unwrap();

        assert!(matches!(
            cart.update_quantity(&p.id_typed(), 6),
            Err(CartError::StockExceeded { requested: 6, available: 5, .. })
        ));
        cart.update_quantity(&p.id_typed(), 5).unwrap();
        assert_eq!(cart.lines()[0].quantity, 5);

        let other = product(100, None, 1);
        assert_eq!(
            cart.update_quantity(&other.id_typed(), 1),
            Err(CartError::LineNotFound(other.id_typed()))
        );
    }

    #[test]
    fn overflowing_price_is_an_error_and_leaves_the_cart_unchanged() {
        let huge: Money = "50000000000000000000000000000".parse().unwrap();
        let bullion = Product::new(ProductId::new(AggregateId::new()), "Bullion", huge, None, 10)
            .unwrap();
        let mut cart = Cart::new();

        assert_eq!(
            cart.add(&bullion, 2),
            Err(CartError::Pricing(PricingError::AmountOverflow))
        );
        assert!(cart.is_empty());

        cart.add(&bullion, 1).unwrap();
        let before = cart.clone();
        assert_eq!(
            cart.add(&bullion, 1),
            Err(CartError::Pricing(PricingError::AmountOverflow))
        );
        assert_eq!(
            cart.update_quantity(&bullion.id_typed(), 3),
            Err(CartError::Pricing(PricingError::AmountOverflow))
        );
        assert_eq!(
            cart.set_shipping(ShippingSelection::Custom(huge)),
            Err(CartError::Pricing(PricingError::AmountOverflow))
        );
        assert_eq!(cart, before);
        assert_eq!(cart.pricing().total, huge);
    }

    #[test]
    fn remove_is_idempotent() {
        let p = product(1000, None, 5);
        let mut cart = Cart::new();
        cart.add(&p, 1).unwrap();

        cart.remove(&p.id_typed()).unwrap();
        cart.remove(&p.id_typed()).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn reprice_updates_snapshot_only_when_asked() {
        let p = product(2000, None, 5);
        let mut cart = Cart::new();
        cart.add(&p, 1).unwrap();

        let promoted = Product::new(p.id_typed(), p.name(), p.price(), Some(Money::from_major(15)), 5)
            .unwrap();
        cart.add(&promoted, 1).unwrap();
        assert_eq!(cart.lines()[0].unit_price, Money::from_major(20));

        cart.reprice(&promoted).unwrap();
        assert_eq!(cart.lines()[0].unit_price, Money::from_major(15));
        assert_eq!(cart.pricing().subtotal, Money::from_major(30));
    }

    #[test]
    fn discount_and_shipping_recompute_totals() {
        let p = product(5000, None, 10);
        let mut cart = Cart::new();
        cart.add(&p, 2).unwrap();

        cart.set_discount(DiscountSpec::Percent(Decimal::from(10))).unwrap();
        let pricing = cart.set_shipping(ShippingSelection::Free).unwrap();
        assert_eq!(pricing.discount_amount, Money::from_major(10));
        assert_eq!(pricing.total, Money::from_major(90));

        assert!(cart.set_discount(DiscountSpec::Percent(Decimal::from(150))).is_err());
        assert_eq!(cart.discount(), &DiscountSpec::Percent(Decimal::from(10)));
    }

    #[test]
    fn cash_payment_computes_change() {
        let p = product(9000, None, 10);
        let mut cart = Cart::new();
        cart.add(&p, 1).unwrap();

        let pricing = cart.set_payment(PaymentMethod::cash(Money::from_major(100))).unwrap();
        assert_eq!(pricing.change, Some(Money::from_major(10)));
    }

    #[test]
    fn insufficient_cash_is_rejected_when_set() {
        let p = product(9000, None, 10);
        let mut cart = Cart::new();
        cart.add(&p, 1).unwrap();

        let err = cart.set_payment(PaymentMethod::cash(Money::from_major(80))).unwrap_err();
        assert_eq!(
            err,
            CartError::Pricing(PricingError::PaymentAmountInsufficient {
                paid: Money::from_major(80),
                total: Money::from_major(90),
            })
        );
        assert!(cart.payment().is_none());
    }

    #[test]
    fn total_change_after_cash_payment_flags_shortfall() {
        let p = product(9000, None, 10);
        let mut cart = ready_cart(&p, 1);
        cart.set_payment(PaymentMethod::cash(Money::from_major(100))).unwrap();

        cart.set_shipping(ShippingSelection::Fee10).unwrap();
        assert!(cart.payment_shortfall().is_none());

        cart.add(&p, 1).unwrap();
        assert!(cart.payment_shortfall().is_some());
        assert_eq!(cart.pricing().change, None);

        let placement = RecordingPlacement::default();
        assert!(matches!(
            cart.checkout(&placement),
            Err(CheckoutError::Payment(PricingError::PaymentAmountInsufficient { .. }))
        ));
        assert!(placement.drafts.borrow().is_empty());
    }

    #[test]
    fn checkout_names_every_missing_condition() {
        let mut cart = Cart::new();
        let placement = RecordingPlacement::default();

        match cart.checkout(&placement) {
            Err(CheckoutError::NotReady(missing)) => assert_eq!(
                missing,
                vec![
                    MissingCondition::Client,
                    MissingCondition::Lines,
                    MissingCondition::PaymentMethod
                ]
            ),
            other => panic!("expected NotReady, got {other:?}"),
        }
    }

    #[test]
    fn checkout_places_pending_order_and_clears_cart() {
        let p = product(2500, None, 10);
        let mut cart = ready_cart(&p, 2);
        cart.set_shipping(ShippingSelection::Fee7).unwrap();
        let placement = RecordingPlacement::default();

        let order = cart.checkout(&placement).unwrap();

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.total(), Money::from_major(57));
        assert_eq!(order.lines()[0].product_name, "Notebook A5");
        assert!(cart.is_empty());
        assert!(cart.client_id().is_none());
        assert_eq!(placement.drafts.borrow().len(), 1);
    }

    #[test]
    fn failed_placement_keeps_cart() {
        let p = product(2500, None, 10);
        let mut cart = ready_cart(&p, 2);
        let placement = RecordingPlacement {
            fail: true,
            ..Default::default()
        };

        assert!(matches!(
            cart.checkout(&placement),
            Err(CheckoutError::Placement("store unavailable"))
        ));
        assert_eq!(cart.lines().len(), 1);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: two adds within stock always produce a single merged line.
            #[test]
            fn adds_merge_into_one_line(q1 in 1i64..50, q2 in 1i64..50) {
                let p = product(199, None, q1 + q2);
                let mut cart = Cart::new();
                cart.add(&p, q1).unwrap();
                cart.add(&p, q2).unwrap();

                prop_assert_eq!(cart.lines().len(), 1);
                prop_assert_eq!(i64::from(cart.lines()[0].quantity), q1 + q2);
                prop_assert_eq!(cart.pricing().subtotal, Money::from_minor(199 * (q1 + q2)));
            }
        }
    }
}
