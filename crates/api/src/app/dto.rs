use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use shopkeep_catalog::Product;
use shopkeep_core::{ClientId, Money};
use shopkeep_infra::projections::OrderFilter;
use shopkeep_sales::{DiscountSpec, Order, OrderStatus, OrderSummary, PaymentMethod, ShippingSelection};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: Money,
    pub promotional_price: Option<Money>,
    #[serde(default)]
    pub stock: i64,
}

#[derive(Debug, Deserialize)]
pub struct RestockRequest {
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutLineRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// A whole cart submitted in one request. Missing client or payment is reported as
/// a checkout precondition failure, not a parse error.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub client_id: Option<ClientId>,
    #[serde(default)]
    pub lines: Vec<CheckoutLineRequest>,
    #[serde(default)]
    pub discount: DiscountSpec,
    #[serde(default)]
    pub shipping: ShippingSelection,
    pub payment: Option<PaymentMethod>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmOrderRequest {
    pub shipping_fee: Option<Money>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
    pub client_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ListOrdersQuery {
    pub fn into_filter(self) -> Result<OrderFilter, axum::response::Response> {
        let status = match self.status.as_deref() {
            None | Some("") => None,
            Some(s) => Some(s.parse::<OrderStatus>().map_err(|_| {
                errors::bad_request(
                    "invalid_status",
                    "status must be one of: pending, paid, cancelled",
                )
            })?),
        };
        let client_id = match self.client_id.as_deref() {
            None | Some("") => None,
            Some(s) => Some(
                s.parse::<ClientId>()
                    .map_err(|_| errors::bad_request("invalid_id", "invalid client id"))?,
            ),
        };
        Ok(OrderFilter {
            status,
            client_id,
            created_from: self.from,
            created_to: self.to,
        })
    }
}

// -------------------------
// Response mapping
// -------------------------

pub fn product_to_json(p: &Product) -> JsonValue {
    json!({
        "id": p.id_typed().to_string(),
        "name": p.name(),
        "price": p.price(),
        "promotional_price": p.promotional_price(),
        "effective_price": p.effective_unit_price(),
        "stock": p.stock(),
    })
}

pub fn order_summary_to_json(s: &OrderSummary) -> JsonValue {
    json!({
        "id": s.order_id.to_string(),
        "client_id": s.client_id.to_string(),
        "status": s.status.as_str(),
        "lines": s.lines.iter().map(|l| json!({
            "product_id": l.product_id.to_string(),
            "product_name": l.product_name,
            "unit_price": l.unit_price,
            "quantity": l.quantity,
            "line_total": l.line_total(),
        })).collect::<Vec<_>>(),
        "subtotal": s.subtotal,
        "discount_amount": s.discount_amount,
        "shipping_fee": s.shipping_fee,
        "total": s.total,
        "shipping_fee_charged": s.shipping_fee_charged,
        "amount_due": s.amount_due,
        "payment_method": s.payment_method.label(),
        "paid_amount": s.paid_amount,
        "change": s.change,
        "created_at": s.created_at,
        "updated_at": s.updated_at,
    })
}

/// Command responses render straight from the aggregate, not the read model.
pub fn order_to_json(order: &Order) -> JsonValue {
    match OrderSummary::from_order(order) {
        Some(s) => order_summary_to_json(&s),
        None => json!({ "id": order.id_typed().to_string() }),
    }
}
