use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use shopkeep_core::{AggregateId, ClientId};
use shopkeep_events::EventEnvelope;
use shopkeep_sales::{OrderEvent, OrderId, OrderStatus, OrderSummary};

use crate::lifecycle::ORDER_AGGREGATE_TYPE;
use crate::read_model::ReadModelStore;

#[derive(Debug, Error)]
pub enum OrdersProjectionError {
    #[error("failed to deserialize order event: {0}")]
    Deserialize(String),
    #[error("stream mismatch: {0}")]
    StreamMismatch(String),
    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
    #[error("event for unknown order {0}")]
    MissingOrder(OrderId),
}

/// Order listing filter. Every set field must match; date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub client_id: Option<ClientId>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

impl OrderFilter {
    pub fn matches(&self, order: &OrderSummary) -> bool {
        self.status.is_none_or(|s| order.status == s)
            && self.client_id.is_none_or(|c| order.client_id == c)
            && self.created_from.is_none_or(|from| order.created_at >= from)
            && self.created_to.is_none_or(|to| order.created_at <= to)
    }
}

/// Orders read model: one `OrderSummary` per order.
#[derive(Debug)]
pub struct OrdersProjection<S>
where
    S: ReadModelStore<OrderId, OrderSummary>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> OrdersProjection<S>
where
    S: ReadModelStore<OrderId, OrderSummary>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    fn get_cursor(&self, aggregate_id: AggregateId) -> u64 {
        match self.cursors.read() {
            Ok(cursors) => *cursors.get(&aggregate_id).unwrap_or(&0),
            Err(_) => 0,
        }
    }

    fn update_cursor(&self, aggregate_id: AggregateId, seq: u64) {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.insert(aggregate_id, seq);
        }
    }

    fn clear_cursors(&self) {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.clear();
        }
    }

    pub fn get(&self, order_id: &OrderId) -> Option<OrderSummary> {
        self.store.get(order_id)
    }

    /// Orders matching `filter`, oldest first.
    pub fn query(&self, filter: &OrderFilter) -> Vec<OrderSummary> {
        let mut orders: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|o| filter.matches(o))
            .collect();
        orders.sort_by_key(|o| (o.created_at, o.order_id));
        orders
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), OrdersProjectionError> {
        if envelope.aggregate_type() != ORDER_AGGREGATE_TYPE {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        let last = self.get_cursor(aggregate_id);
        if seq == 0 {
            return Err(OrdersProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            // Redelivery.
            return Ok(());
        }
        if seq != last + 1 && last != 0 {
            return Err(OrdersProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let ev: OrderEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| OrdersProjectionError::Deserialize(e.to_string()))?;

        let order_id = ev.order_id();
        if order_id.0 != aggregate_id {
            return Err(OrdersProjectionError::StreamMismatch(
                "event order_id does not match envelope aggregate_id".to_string(),
            ));
        }

        let summary = match &ev {
            OrderEvent::OrderPlaced(e) => OrderSummary::from_placed(e),
            other => {
                let mut summary = self
                    .store
                    .get(&order_id)
                    .ok_or(OrdersProjectionError::MissingOrder(order_id))?;
                summary.apply(other);
                summary
            }
        };
        self.store.upsert(order_id, summary);

        self.update_cursor(aggregate_id, seq);
        Ok(())
    }

    /// Clear the read model and replay `envelopes` in stream order.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), OrdersProjectionError> {
        let mut envs: Vec<_> = envelopes.into_iter().collect();

        self.store.clear();
        self.clear_cursors();

        envs.sort_by_key(|e| (e.aggregate_id(), e.sequence_number()));

        for env in &envs {
            self.apply_envelope(env)?;
        }
        Ok(())
    }
}
