//! Sales domain module: the sale transaction engine.
//!
//! - [`pricing`]: pure price computation (subtotal, discount, shipping, total, change)
//! - [`cart`]: the session-scoped cart aggregate and checkout
//! - [`order`]: the event-sourced order aggregate (`pending` → `paid` | `cancelled`)
//! - [`summary`]: the read-only order view handed to downstream consumers

pub mod cart;
pub mod discount;
pub mod order;
pub mod payment;
pub mod pricing;
pub mod shipping;
pub mod summary;

pub use cart::{Cart, CartError, CartLine, CheckoutError, MissingCondition, OrderPlacement};
pub use discount::DiscountSpec;
pub use order::{
    CancelOrder, ConfirmOrder, Order, OrderAction, OrderCancelled, OrderCommand, OrderConfirmed,
    OrderDraft, OrderError, OrderEvent, OrderId, OrderLine, OrderPlaced, OrderStatus, PlaceOrder,
};
pub use payment::PaymentMethod;
pub use pricing::{PricingError, PricingResult};
pub use shipping::ShippingSelection;
pub use summary::OrderSummary;
