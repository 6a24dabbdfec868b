use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopkeep_core::{ClientId, Money};

use crate::order::{self, Order, OrderEvent, OrderId, OrderLine, OrderPlaced, OrderStatus};
use crate::payment::PaymentMethod;
use crate::pricing::PricingResult;

/// Read-only view of an order.
///
/// Emitted after a successful confirmation for receipt/notification consumers, and
/// used as the row type of the orders read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub client_id: ClientId,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub shipping_fee: Money,
    pub total: Money,
    pub shipping_fee_charged: Money,
    pub amount_due: Money,
    pub payment_method: PaymentMethod,
    pub paid_amount: Option<Money>,
    pub change: Option<Money>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderSummary {
    /// `None` for an order that was never placed.
    pub fn from_order(order: &Order) -> Option<Self> {
        Some(Self {
            order_id: order.id_typed(),
            client_id: order.client_id()?,
            status: order.status(),
            lines: order.lines().to_vec(),
            subtotal: order.subtotal(),
            discount_amount: order.discount_amount(),
            shipping_fee: order.shipping_fee(),
            total: order.total(),
            shipping_fee_charged: order.shipping_fee_charged(),
            amount_due: order.amount_due(),
            payment_method: order.payment_method()?,
            paid_amount: order.paid_amount(),
            change: order.change_due(),
            created_at: order.created_at()?,
            updated_at: order.updated_at()?,
        })
    }

    /// Summary right after checkout.
    pub fn from_placed(e: &OrderPlaced) -> Self {
        Self {
            order_id: e.order_id,
            client_id: e.client_id,
            status: OrderStatus::Pending,
            lines: e.lines.clone(),
            subtotal: e.pricing.subtotal,
            discount_amount: e.pricing.discount_amount,
            shipping_fee: e.pricing.shipping_fee,
            total: e.pricing.total,
            shipping_fee_charged: e.pricing.shipping_fee,
            amount_due: e.pricing.total,
            payment_method: e.payment_method,
            paid_amount: e.payment_method.paid_amount(),
            change: e.pricing.change,
            created_at: e.occurred_at,
            updated_at: e.occurred_at,
        }
    }

    /// Fold a later event into the summary. `OrderPlaced` resets it.
    pub fn apply(&mut self, event: &OrderEvent) {
        match event {
            OrderEvent::OrderPlaced(e) => *self = Self::from_placed(e),
            OrderEvent::OrderConfirmed(e) => {
                let pricing = PricingResult {
                    subtotal: self.subtotal,
                    discount_amount: self.discount_amount,
                    shipping_fee: self.shipping_fee,
                    total: self.total,
                    change: None,
                };
                self.status = OrderStatus::Paid;
                self.shipping_fee_charged = e.shipping_fee.unwrap_or(self.shipping_fee);
                self.amount_due = order::amount_due_with(&pricing, self.shipping_fee_charged);
                self.change = self
                    .paid_amount
                    .map(|paid| (paid - self.amount_due).floor_zero());
                self.updated_at = e.occurred_at;
            }
            OrderEvent::OrderCancelled(e) => {
                self.status = OrderStatus::Cancelled;
                self.updated_at = e.occurred_at;
            }
        }
    }

    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }
}
