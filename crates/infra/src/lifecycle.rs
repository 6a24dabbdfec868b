//! Order lifecycle manager.
//!
//! Turns cart snapshots into pending orders and drives the `pending → paid` and
//! `pending → cancelled` transitions.
//!
//! `confirm` is the only operation that touches stock:
//!
//! ```text
//! lock order → load → decide (status check) → decrement all lines → append → publish
//! ```
//!
//! The stock decrement is all-or-nothing and serialized per product by the stock
//! store. If the append fails after a successful decrement, the decrement is
//! compensated with a restock before the error is returned.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, info, warn};

use shopkeep_core::{Aggregate, AggregateId, Money};
use shopkeep_events::{EventBus, EventEnvelope};
use shopkeep_inventory::{InventoryError, StockRequest, StockStore};
use shopkeep_sales::{
    CancelOrder, ConfirmOrder, Order, OrderCommand, OrderDraft, OrderError, OrderId,
    OrderPlacement, OrderSummary, PlaceOrder,
};

use crate::command_dispatcher::{CommandDispatcher, Committed, DispatchError, Loaded};
use crate::event_store::EventStore;

/// Aggregate type tag of order streams.
pub const ORDER_AGGREGATE_TYPE: &str = "sales.order";

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Authoritative stock check failed, or the stock store rejected the request.
    #[error(transparent)]
    Stock(#[from] InventoryError),

    #[error("order was modified concurrently: {0}")]
    Concurrency(String),

    #[error("order persistence failed: {0}")]
    Persistence(String),

    #[error("order lock poisoned")]
    Poisoned,
}

impl From<DispatchError<OrderError>> for LifecycleError {
    fn from(value: DispatchError<OrderError>) -> Self {
        match value {
            DispatchError::Domain(e) => LifecycleError::Order(e),
            DispatchError::Concurrency(msg) => LifecycleError::Concurrency(msg),
            DispatchError::Deserialize(msg) => LifecycleError::Persistence(msg),
            DispatchError::Store(e) => LifecycleError::Persistence(e.to_string()),
        }
    }
}

/// Order lifecycle manager.
///
/// - `S`: event store for order streams
/// - `B`: bus for order event envelopes (read models)
/// - `K`: authoritative stock
/// - `N`: bus for post-confirmation summaries (notifications)
#[derive(Debug)]
pub struct OrderLifecycleManager<S, B, K, N> {
    dispatcher: CommandDispatcher<S, B>,
    stock: K,
    summaries: N,
    order_locks: Mutex<HashMap<OrderId, Arc<Mutex<()>>>>,
}

impl<S, B, K, N> OrderLifecycleManager<S, B, K, N>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    K: StockStore,
    N: EventBus<OrderSummary>,
{
    pub fn new(store: S, bus: B, stock: K, summaries: N) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            stock,
            summaries,
            order_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn event_store(&self) -> &S {
        self.dispatcher.store()
    }

    /// Persist a cart snapshot as a new `pending` order. No stock is touched.
    pub fn place(&self, draft: OrderDraft) -> Result<Order, LifecycleError> {
        let order_id = OrderId::new(AggregateId::new());
        let command = OrderCommand::PlaceOrder(PlaceOrder {
            order_id,
            draft,
            occurred_at: Utc::now(),
        });

        let Committed { aggregate, .. } =
            self.dispatcher
                .dispatch(order_id.0, ORDER_AGGREGATE_TYPE, &command, make_order)?;

        info!(
            order_id = %order_id,
            total = %aggregate.total(),
            lines = aggregate.lines().len(),
            "order placed"
        );
        Ok(aggregate)
    }

    /// Current state of an order.
    pub fn get(&self, order_id: OrderId) -> Result<Order, LifecycleError> {
        let Loaded { aggregate, .. } = self.dispatcher.load(order_id.0, make_order)?;
        if !aggregate.is_placed() {
            return Err(OrderError::NotFound.into());
        }
        Ok(aggregate)
    }

    /// `pending → paid`, decrementing stock for every line as one unit.
    ///
    /// Fails with `Stock(StockInsufficient{..})` without touching any stock when a
    /// single line cannot be covered, and with `InvalidTransition` on a terminal
    /// order. A supplied `shipping_fee` is recorded as the fee charged.
    pub fn confirm(
        &self,
        order_id: OrderId,
        shipping_fee: Option<Money>,
    ) -> Result<Order, LifecycleError> {
        self.with_order_lock(order_id, || self.confirm_locked(order_id, shipping_fee))
    }

    fn confirm_locked(
        &self,
        order_id: OrderId,
        shipping_fee: Option<Money>,
    ) -> Result<Order, LifecycleError> {
        let Loaded {
            aggregate,
            expected,
        } = self.dispatcher.load(order_id.0, make_order)?;

        let command = OrderCommand::ConfirmOrder(ConfirmOrder {
            order_id,
            shipping_fee,
            occurred_at: Utc::now(),
        });
        let decided = aggregate.handle(&command)?;

        let requests = stock_requests(&aggregate);
        if let Err(err) = self.stock.decrement_all(&requests) {
            warn!(order_id = %order_id, error = %err, "order confirmation rejected by stock check");
            return Err(err.into());
        }

        let committed = self.dispatcher.commit(
            aggregate,
            order_id.0,
            ORDER_AGGREGATE_TYPE,
            expected,
            decided,
        );
        let order = match committed {
            Ok(Committed { aggregate, .. }) => aggregate,
            Err(err) => {
                warn!(order_id = %order_id, error = %err, "confirmation append failed, restoring stock");
                if let Err(restock_err) = self.stock.restock(&requests) {
                    error!(
                        order_id = %order_id,
                        error = %restock_err,
                        "stock compensation failed"
                    );
                }
                return Err(err.into());
            }
        };

        info!(
            order_id = %order_id,
            amount_due = %order.amount_due(),
            "order confirmed"
        );
        self.publish_summary(&order);
        Ok(order)
    }

    /// `pending → cancelled`. Never touches stock.
    pub fn cancel(&self, order_id: OrderId) -> Result<Order, LifecycleError> {
        self.with_order_lock(order_id, || {
            let command = OrderCommand::CancelOrder(CancelOrder {
                order_id,
                occurred_at: Utc::now(),
            });
            let Committed { aggregate, .. } =
                self.dispatcher
                    .dispatch(order_id.0, ORDER_AGGREGATE_TYPE, &command, make_order)?;

            info!(order_id = %order_id, "order cancelled");
            Ok(aggregate)
        })
    }

    /// Run `f` holding the order's lock. The lock table only keeps entries for
    /// orders with a transition in flight.
    fn with_order_lock<T>(
        &self,
        order_id: OrderId,
        f: impl FnOnce() -> Result<T, LifecycleError>,
    ) -> Result<T, LifecycleError> {
        let lock = {
            let mut locks = self.order_locks.lock().map_err(|_| LifecycleError::Poisoned)?;
            locks.entry(order_id).or_default().clone()
        };

        let result = match lock.lock() {
            Ok(_guard) => f(),
            Err(_) => Err(LifecycleError::Poisoned),
        };

        self.release_order_lock(order_id, lock);
        result
    }

    fn release_order_lock(&self, order_id: OrderId, lock: Arc<Mutex<()>>) {
        let Ok(mut locks) = self.order_locks.lock() else {
            warn!(order_id = %order_id, "order lock table poisoned; entry not released");
            return;
        };
        // Clones are only taken under the table lock: two means the table and us.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&order_id);
        }
    }

    /// Fire-and-forget: the order is already paid whatever happens here.
    fn publish_summary(&self, order: &Order) {
        let Some(summary) = OrderSummary::from_order(order) else {
            return;
        };
        if let Err(err) = self.summaries.publish(summary) {
            warn!(order_id = %order.id_typed(), error = ?err, "order summary publication failed");
        }
    }
}

impl<S, B, K, N> OrderPlacement for OrderLifecycleManager<S, B, K, N>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    K: StockStore,
    N: EventBus<OrderSummary>,
{
    type Error = LifecycleError;

    fn place(&self, draft: OrderDraft) -> Result<Order, Self::Error> {
        OrderLifecycleManager::place(self, draft)
    }
}

fn make_order(id: AggregateId) -> Order {
    Order::empty(OrderId::new(id))
}

fn stock_requests(order: &Order) -> Vec<StockRequest> {
    order
        .lines()
        .iter()
        .map(|l| StockRequest::new(l.product_id, l.quantity))
        .collect()
}
