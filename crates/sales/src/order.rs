use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shopkeep_catalog::ProductId;
use shopkeep_core::{Aggregate, AggregateId, AggregateRoot, ClientId, DomainError, Money};
use shopkeep_events::Event;

use crate::payment::PaymentMethod;
use crate::pricing::{self, PricingError, PricingResult};

/// Order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub AggregateId);

impl OrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for OrderId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Order status lifecycle. `Paid` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::validation(format!("unknown order status: {other}"))),
        }
    }
}

/// Transition requested on an existing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction {
    Confirm,
    Cancel,
}

impl core::fmt::Display for OrderAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            OrderAction::Confirm => "confirm",
            OrderAction::Cancel => "cancel",
        })
    }
}

/// Frozen copy of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderLine {
    /// Placement rejects lines whose totals overflow, so this is safe on a placed order.
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// The snapshot a cart hands over at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub client_id: ClientId,
    pub lines: Vec<OrderLine>,
    pub pricing: PricingResult,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("cannot {action} an order that is {from}")]
    InvalidTransition { from: OrderStatus, action: OrderAction },

    #[error("order not found")]
    NotFound,

    #[error("order already exists")]
    AlreadyExists,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Payment(#[from] PricingError),
}

/// Aggregate root: Order.
///
/// Everything recorded by `OrderPlaced` is immutable afterwards; later events only
/// move `status`/`updated_at` and record the fee charged at settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    client_id: Option<ClientId>,
    status: OrderStatus,
    lines: Vec<OrderLine>,
    pricing: PricingResult,
    payment_method: Option<PaymentMethod>,
    shipping_fee_override: Option<Money>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Order {
    /// Create an empty, not-yet-placed aggregate instance for rehydration.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            client_id: None,
            status: OrderStatus::Pending,
            lines: Vec::new(),
            pricing: PricingResult::default(),
            payment_method: None,
            shipping_fee_override: None,
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn is_placed(&self) -> bool {
        self.created
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn pricing(&self) -> &PricingResult {
        &self.pricing
    }

    pub fn subtotal(&self) -> Money {
        self.pricing.subtotal
    }

    pub fn discount_amount(&self) -> Money {
        self.pricing.discount_amount
    }

    /// Shipping fee frozen at checkout.
    pub fn shipping_fee(&self) -> Money {
        self.pricing.shipping_fee
    }

    pub fn total(&self) -> Money {
        self.pricing.total
    }

    pub fn change(&self) -> Option<Money> {
        self.pricing.change
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn paid_amount(&self) -> Option<Money> {
        self.payment_method.and_then(|p| p.paid_amount())
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Fee supplied at confirmation, if any.
    pub fn shipping_fee_override(&self) -> Option<Money> {
        self.shipping_fee_override
    }

    /// Fee actually charged: the confirmation override, else the checkout fee.
    pub fn shipping_fee_charged(&self) -> Money {
        self.shipping_fee_override.unwrap_or(self.pricing.shipping_fee)
    }

    /// Total adjusted by the shipping override delta, floored at zero.
    pub fn amount_due(&self) -> Money {
        amount_due_with(&self.pricing, self.shipping_fee_charged())
    }

    /// Cash change against `amount_due()`.
    pub fn change_due(&self) -> Option<Money> {
        self.paid_amount().map(|paid| (paid - self.amount_due()).floor_zero())
    }
}

pub(crate) fn amount_due_with(pricing: &PricingResult, shipping_fee: Money) -> Money {
    (pricing.total - pricing.shipping_fee + shipping_fee).floor_zero()
}

fn checked_amount_due(pricing: &PricingResult, shipping_fee: Money) -> Option<Money> {
    pricing
        .total
        .checked_sub(pricing.shipping_fee)
        .and_then(|m| m.checked_add(shipping_fee))
        .map(Money::floor_zero)
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceOrder (checkout).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub draft: OrderDraft,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmOrder, with an optional shipping fee override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmOrder {
    pub order_id: OrderId,
    pub shipping_fee: Option<Money>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    PlaceOrder(PlaceOrder),
    ConfirmOrder(ConfirmOrder),
    CancelOrder(CancelOrder),
}

/// Event: OrderPlaced. Carries the full immutable snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub client_id: ClientId,
    pub lines: Vec<OrderLine>,
    pub pricing: PricingResult,
    pub payment_method: PaymentMethod,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderConfirmed. Stock for every line was decremented before this was
/// appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmed {
    pub order_id: OrderId,
    pub shipping_fee: Option<Money>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    OrderConfirmed(OrderConfirmed),
    OrderCancelled(OrderCancelled),
}

impl OrderEvent {
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderEvent::OrderPlaced(e) => e.order_id,
            OrderEvent::OrderConfirmed(e) => e.order_id,
            OrderEvent::OrderCancelled(e) => e.order_id,
        }
    }
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "sales.order.placed",
            OrderEvent::OrderConfirmed(_) => "sales.order.confirmed",
            OrderEvent::OrderCancelled(_) => "sales.order.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(e) => e.occurred_at,
            OrderEvent::OrderConfirmed(e) => e.occurred_at,
            OrderEvent::OrderCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = OrderError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                self.id = e.order_id;
                self.client_id = Some(e.client_id);
                self.status = OrderStatus::Pending;
                self.lines = e.lines.clone();
                self.pricing = e.pricing;
                self.payment_method = Some(e.payment_method);
                self.shipping_fee_override = None;
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            OrderEvent::OrderConfirmed(e) => {
                self.status = OrderStatus::Paid;
                self.shipping_fee_override = e.shipping_fee;
                self.updated_at = Some(e.occurred_at);
            }
            OrderEvent::OrderCancelled(e) => {
                self.status = OrderStatus::Cancelled;
                self.updated_at = Some(e.occurred_at);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            OrderCommand::ConfirmOrder(cmd) => self.handle_confirm(cmd),
            OrderCommand::CancelOrder(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl Order {
    fn ensure_order_id(&self, order_id: OrderId) -> Result<(), OrderError> {
        if self.id != order_id {
            return Err(OrderError::Validation("order_id mismatch".to_string()));
        }
        Ok(())
    }

    fn ensure_pending(&self, action: OrderAction) -> Result<(), OrderError> {
        if !self.created {
            return Err(OrderError::NotFound);
        }
        if self.status != OrderStatus::Pending {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                action,
            });
        }
        Ok(())
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, OrderError> {
        if self.created {
            return Err(OrderError::AlreadyExists);
        }
        self.ensure_order_id(cmd.order_id)?;

        let draft = &cmd.draft;
        if draft.lines.is_empty() {
            return Err(OrderError::Validation("cannot place an order without lines".to_string()));
        }
        if draft.lines.iter().any(|l| l.quantity == 0) {
            return Err(OrderError::Validation("line quantity must be positive".to_string()));
        }
        if draft.lines.iter().any(|l| !l.unit_price.is_positive()) {
            return Err(OrderError::Validation("unit_price must be positive".to_string()));
        }

        let line_totals = draft
            .lines
            .iter()
            .map(|l| pricing::line_total(l.unit_price, l.quantity))
            .collect::<Result<Vec<_>, _>>()?;
        let subtotal = Money::checked_sum(line_totals).ok_or(PricingError::AmountOverflow)?;
        let p = &draft.pricing;
        let expected_total = p
            .subtotal
            .checked_sub(p.discount_amount)
            .and_then(|m| m.checked_add(p.shipping_fee))
            .map(Money::floor_zero);
        if p.subtotal != subtotal
            || p.discount_amount > p.subtotal
            || expected_total != Some(p.total)
        {
            return Err(OrderError::Validation(
                "totals do not match the order lines".to_string(),
            ));
        }

        let change = pricing::change_for(&draft.payment_method, p.total)?;
        let mut frozen = *p;
        frozen.change = change;

        Ok(vec![OrderEvent::OrderPlaced(OrderPlaced {
            order_id: cmd.order_id,
            client_id: draft.client_id,
            lines: draft.lines.clone(),
            pricing: frozen,
            payment_method: draft.payment_method,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm(&self, cmd: &ConfirmOrder) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_pending(OrderAction::Confirm)?;
        self.ensure_order_id(cmd.order_id)?;

        if let Some(fee) = cmd.shipping_fee {
            if fee.is_negative() {
                return Err(PricingError::InvalidShippingFee(fee).into());
            }
            let due = checked_amount_due(&self.pricing, fee).ok_or(PricingError::AmountOverflow)?;
            if let Some(method) = self.payment_method {
                pricing::change_for(&method, due)?;
            }
        }

        Ok(vec![OrderEvent::OrderConfirmed(OrderConfirmed {
            order_id: cmd.order_id,
            shipping_fee: cmd.shipping_fee,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelOrder) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_pending(OrderAction::Cancel)?;
        self.ensure_order_id(cmd.order_id)?;

        Ok(vec![OrderEvent::OrderCancelled(OrderCancelled {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_order_id() -> OrderId {
        OrderId::new(AggregateId::new())
    }

    fn test_product_id() -> ProductId {
        ProductId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn line(unit_cents: i64, quantity: u32) -> OrderLine {
        OrderLine {
            product_id: test_product_id(),
            product_name: "Espresso cup".to_string(),
            unit_price: Money::from_minor(unit_cents),
            quantity,
        }
    }

    fn draft(lines: Vec<OrderLine>, shipping_fee: Money, payment: PaymentMethod) -> OrderDraft {
        let subtotal: Money = lines.iter().map(OrderLine::line_total).sum();
        OrderDraft {
            client_id: ClientId::new(),
            lines,
            pricing: PricingResult {
                subtotal,
                discount_amount: Money::ZERO,
                shipping_fee,
                total: subtotal + shipping_fee,
                change: None,
            },
            payment_method: payment,
        }
    }

    fn place(order: &mut Order, draft: OrderDraft) -> Result<(), OrderError> {
        let cmd = OrderCommand::PlaceOrder(PlaceOrder {
            order_id: order.id_typed(),
            draft,
            occurred_at: test_time(),
        });
        shopkeep_events::execute(order, &cmd).map(|_| ())
    }

    fn placed_order(payment: PaymentMethod) -> Order {
        let mut order = Order::empty(test_order_id());
        place(&mut order, draft(vec![line(2500, 2)], Money::from_major(7), payment)).unwrap();
        order
    }

    fn confirm(order: &Order, shipping_fee: Option<Money>) -> Result<Vec<OrderEvent>, OrderError> {
        order.handle(&OrderCommand::ConfirmOrder(ConfirmOrder {
            order_id: order.id_typed(),
            shipping_fee,
            occurred_at: test_time(),
        }))
    }

    fn cancel(order: &Order) -> Result<Vec<OrderEvent>, OrderError> {
        order.handle(&OrderCommand::CancelOrder(CancelOrder {
            order_id: order.id_typed(),
            occurred_at: test_time(),
        }))
    }

    #[test]
    fn place_records_snapshot_as_pending() {
        let order = placed_order(PaymentMethod::cash(Money::from_major(60)));

        assert!(order.is_placed());
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.subtotal(), Money::from_major(50));
        assert_eq!(order.total(), Money::from_major(57));
        assert_eq!(order.change(), Some(Money::from_major(3)));
        assert_eq!(order.version(), 1);
        assert_eq!(order.created_at(), order.updated_at());
    }

    #[test]
    fn place_twice_is_rejected() {
        let mut order = placed_order(PaymentMethod::Pix);
        let err = place(&mut order, draft(vec![line(100, 1)], Money::ZERO, PaymentMethod::Pix))
            .unwrap_err();
        assert_eq!(err, OrderError::AlreadyExists);
    }

    #[test]
    fn place_rejects_inconsistent_totals() {
        let mut bad = draft(vec![line(1000, 1)], Money::ZERO, PaymentMethod::Pix);
        bad.pricing.total = Money::from_major(1);

        let mut order = Order::empty(test_order_id());
        assert!(matches!(place(&mut order, bad), Err(OrderError::Validation(_))));
        assert!(!order.is_placed());
    }

    #[test]
    fn place_rejects_empty_lines_and_short_cash() {
        let mut order = Order::empty(test_order_id());
        assert!(matches!(
            place(&mut order, draft(vec![], Money::ZERO, PaymentMethod::Pix)),
            Err(OrderError::Validation(_))
        ));

        let short = draft(vec![line(1000, 1)], Money::ZERO, PaymentMethod::cash(Money::from_major(5)));
        assert!(matches!(
            place(&mut order, short),
            Err(OrderError::Payment(PricingError::PaymentAmountInsufficient { .. }))
        ));
    }

    #[test]
    fn place_rejects_lines_whose_totals_overflow() {
        let huge: Money = "50000000000000000000000000000".parse().unwrap();
        let overflowing = OrderDraft {
            client_id: ClientId::new(),
            lines: vec![OrderLine {
                product_id: test_product_id(),
                product_name: "Gold bar".to_string(),
                unit_price: huge,
                quantity: 2,
            }],
            pricing: PricingResult {
                subtotal: huge,
                discount_amount: Money::ZERO,
                shipping_fee: Money::ZERO,
                total: huge,
                change: None,
            },
            payment_method: PaymentMethod::Pix,
        };

        let mut order = Order::empty(test_order_id());
        assert_eq!(
            place(&mut order, overflowing),
            Err(OrderError::Payment(PricingError::AmountOverflow))
        );
        assert!(!order.is_placed());
    }

    #[test]
    fn confirm_rejects_override_that_overflows_the_amount_due() {
        let order = placed_order(PaymentMethod::Pix);
        let huge = Money::new(rust_decimal::Decimal::MAX);
        assert_eq!(
            confirm(&order, Some(huge)),
            Err(OrderError::Payment(PricingError::AmountOverflow))
        );
    }

    #[test]
    fn confirm_moves_pending_to_paid() {
        let mut order = placed_order(PaymentMethod::CreditCard);
        let events = confirm(&order, None).unwrap();
        assert_eq!(events.len(), 1);
        order.apply(&events[0]);

        assert_eq!(order.status(), OrderStatus::Paid);
        assert_eq!(order.shipping_fee_charged(), Money::from_major(7));
        assert_eq!(order.amount_due(), order.total());
        assert_eq!(order.version(), 2);
    }

    #[test]
    fn confirm_override_keeps_snapshot_and_adjusts_amount_due() {
        let mut order = placed_order(PaymentMethod::cash(Money::from_major(60)));
        let events = confirm(&order, Some(Money::from_major(10))).unwrap();
        order.apply(&events[0]);

        assert_eq!(order.shipping_fee(), Money::from_major(7));
        assert_eq!(order.total(), Money::from_major(57));
        assert_eq!(order.shipping_fee_charged(), Money::from_major(10));
        assert_eq!(order.amount_due(), Money::from_major(60));
        assert_eq!(order.change_due(), Some(Money::ZERO));
    }

    #[test]
    fn confirm_rejects_negative_override_and_cash_shortfall() {
        let order = placed_order(PaymentMethod::cash(Money::from_major(60)));

        assert_eq!(
            confirm(&order, Some(Money::from_minor(-1))),
            Err(OrderError::Payment(PricingError::InvalidShippingFee(Money::from_minor(-1))))
        );
        assert!(matches!(
            confirm(&order, Some(Money::from_major(20))),
            Err(OrderError::Payment(PricingError::PaymentAmountInsufficient { .. }))
        ));
    }

    #[test]
    fn cancel_moves_pending_to_cancelled() {
        let mut order = placed_order(PaymentMethod::Pix);
        let events = cancel(&order).unwrap();
        order.apply(&events[0]);
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }

    #[test]
    fn terminal_states_reject_every_transition() {
        let mut paid = placed_order(PaymentMethod::Pix);
        let ev = confirm(&paid, None).unwrap();
        paid.apply(&ev[0]);

        let mut cancelled = placed_order(PaymentMethod::Pix);
        let ev = cancel(&cancelled).unwrap();
        cancelled.apply(&ev[0]);

        for order in [&paid, &cancelled] {
            let from = order.status();
            assert_eq!(
                confirm(order, None),
                Err(OrderError::InvalidTransition { from, action: OrderAction::Confirm })
            );
            assert_eq!(
                cancel(order),
                Err(OrderError::InvalidTransition { from, action: OrderAction::Cancel })
            );
        }
    }

    #[test]
    fn transitions_on_unplaced_order_are_not_found() {
        let order = Order::empty(test_order_id());
        assert_eq!(confirm(&order, None), Err(OrderError::NotFound));
        assert_eq!(cancel(&order), Err(OrderError::NotFound));
    }

    #[test]
    fn invalid_transition_message_names_state_and_action() {
        let err = OrderError::InvalidTransition {
            from: OrderStatus::Paid,
            action: OrderAction::Cancel,
        };
        assert_eq!(err.to_string(), "cannot cancel an order that is paid");
    }

    #[test]
    fn status_parses_from_wire_names() {
        assert_eq!("paid".parse::<OrderStatus>().unwrap(), OrderStatus::Paid);
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn events_round_trip_through_json() {
        let order = placed_order(PaymentMethod::Pix);
        let ev = confirm(&order, Some(Money::from_major(10))).unwrap().remove(0);
        let json = serde_json::to_string(&ev).unwrap();
        let back: OrderEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ev);
        assert_eq!(back.event_type(), "sales.order.confirmed");
    }
}
