//! Command execution pipeline (application-level orchestration).
//!
//! ```text
//! Command
//!   ↓
//! 1. Load events from store
//!   ↓
//! 2. Rehydrate aggregate (apply historical events to rebuild state)
//!   ↓
//! 3. Handle command (pure decision logic, produces events)
//!   ↓
//! 4. Persist events to store (append-only, optimistic concurrency check)
//!   ↓
//! 5. Publish events to bus (projections, handlers)
//! ```
//!
//! `dispatch` runs all five steps. Callers that must perform a side effect between
//! deciding and persisting (stock deduction on order confirmation) use `load`,
//! decide themselves, then `commit`.
//!
//! This module contains no IO itself; it composes the `EventStore` and `EventBus`
//! traits.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use shopkeep_core::{Aggregate, AggregateId, ExpectedVersion};
use shopkeep_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// Dispatch failure, generic over the aggregate's own error type.
#[derive(Debug, Error)]
pub enum DispatchError<E> {
    /// The aggregate rejected the command.
    #[error("{0}")]
    Domain(E),

    /// Optimistic concurrency failure (stale aggregate version).
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// Historical payloads could not be read back as the aggregate's event type.
    #[error("failed to deserialize stored event: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Store(EventStoreError),
}

impl<E> From<EventStoreError> for DispatchError<E> {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            other => DispatchError::Store(other),
        }
    }
}

/// A rehydrated aggregate and the stream version it was loaded at.
#[derive(Debug)]
pub struct Loaded<A> {
    pub aggregate: A,
    pub expected: ExpectedVersion,
}

/// Result of a successful dispatch: the aggregate with the new events applied, and
/// the committed events.
#[derive(Debug)]
pub struct Committed<A> {
    pub aggregate: A,
    pub events: Vec<StoredEvent>,
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// - Events are persisted before publication; if append fails nothing is published.
/// - Each command operates on a single aggregate stream.
/// - Publication is best-effort: the append already happened, so a failed publish is
///   logged and the dispatch still succeeds. Consumers must tolerate redelivery and
///   gaps can be healed by rebuilding projections from the store.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Load and rehydrate an aggregate.
    pub fn load<A>(
        &self,
        aggregate_id: AggregateId,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Loaded<A>, DispatchError<A::Error>>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        let mut aggregate = make_aggregate(aggregate_id);
        apply_history(&mut aggregate, &history)?;

        Ok(Loaded {
            aggregate,
            expected,
        })
    }

    /// Persist decided events at `expected`, apply them to `aggregate`, then publish.
    pub fn commit<A>(
        &self,
        mut aggregate: A,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        expected: ExpectedVersion,
        decided: Vec<A::Event>,
    ) -> Result<Committed<A>, DispatchError<A::Error>>
    where
        A: Aggregate,
        A::Event: shopkeep_events::Event + Serialize,
    {
        if decided.is_empty() {
            return Ok(Committed {
                aggregate,
                events: vec![],
            });
        }

        let uncommitted = decided
            .iter()
            .map(|ev| UncommittedEvent::from_typed(aggregate_id, aggregate_type, Uuid::now_v7(), ev))
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected)?;

        for ev in &decided {
            aggregate.apply(ev);
        }

        for stored in &committed {
            if let Err(err) = self.bus.publish(stored.to_envelope()) {
                warn!(
                    aggregate_id = %aggregate_id,
                    sequence_number = stored.sequence_number,
                    error = ?err,
                    "event publication failed after append"
                );
            }
        }

        Ok(Committed {
            aggregate,
            events: committed,
        })
    }

    /// Full pipeline: load → rehydrate → handle → append → publish.
    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: &A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Committed<A>, DispatchError<A::Error>>
    where
        A: Aggregate,
        A::Event: shopkeep_events::Event + Serialize + DeserializeOwned,
    {
        let Loaded {
            aggregate,
            expected,
        } = self.load(aggregate_id, make_aggregate)?;

        let decided = aggregate.handle(command).map_err(DispatchError::Domain)?;

        self.commit(aggregate, aggregate_id, aggregate_type, expected, decided)
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream<E>(
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError<E>> {
    // Reject foreign or out-of-order events even if a backend returns them.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            ))));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError<A::Error>>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    for stored in history {
        let ev: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use shopkeep_catalog::ProductId;
    use shopkeep_core::{AggregateRoot, ClientId, Money};
    use shopkeep_events::InMemoryEventBus;
    use shopkeep_sales::{
        CancelOrder, Order, OrderCommand, OrderDraft, OrderError, OrderId, OrderLine, OrderStatus,
        PaymentMethod, PlaceOrder, PricingResult,
    };

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

    fn setup() -> (CommandDispatcher<crate::event_store::InMemoryEventStore, Bus>, Bus) {
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        (
            CommandDispatcher::new(crate::event_store::InMemoryEventStore::new(), bus.clone()),
            bus,
        )
    }

    fn place_command(order_id: OrderId) -> OrderCommand {
        let line = OrderLine {
            product_id: ProductId::new(AggregateId::new()),
            product_name: "Mug".to_string(),
            unit_price: Money::from_major(12),
            quantity: 2,
        };
        OrderCommand::PlaceOrder(PlaceOrder {
            order_id,
            draft: OrderDraft {
                client_id: ClientId::new(),
                lines: vec![line],
                pricing: PricingResult {
                    subtotal: Money::from_major(24),
                    discount_amount: Money::ZERO,
                    shipping_fee: Money::ZERO,
                    total: Money::from_major(24),
                    change: None,
                },
                payment_method: PaymentMethod::DebitCard,
            },
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn dispatch_persists_applies_and_publishes() {
        let (dispatcher, bus) = setup();
        let sub = bus.subscribe();
        let order_id = OrderId::new(AggregateId::new());

        let committed = dispatcher
            .dispatch(order_id.0, "sales.order", &place_command(order_id), |id| {
                Order::empty(OrderId::new(id))
            })
            .unwrap();

        assert_eq!(committed.events.len(), 1);
        assert_eq!(committed.aggregate.status(), OrderStatus::Pending);
        assert_eq!(committed.aggregate.version(), 1);

        let env = sub.try_recv().unwrap();
        assert_eq!(env.sequence_number(), 1);
        assert_eq!(env.event_type(), "sales.order.placed");
    }

    #[test]
    fn load_rehydrates_from_history() {
        let (dispatcher, _bus) = setup();
        let order_id = OrderId::new(AggregateId::new());
        dispatcher
            .dispatch(order_id.0, "sales.order", &place_command(order_id), |id| {
                Order::empty(OrderId::new(id))
            })
            .unwrap();

        let loaded = dispatcher
            .load(order_id.0, |id| Order::empty(OrderId::new(id)))
            .unwrap();
        assert!(loaded.aggregate.is_placed());
        assert_eq!(loaded.expected, ExpectedVersion::Exact(1));
    }

    #[test]
    fn domain_errors_are_returned_typed() {
        let (dispatcher, _bus) = setup();
        let order_id = OrderId::new(AggregateId::new());

        let err = dispatcher
            .dispatch(
                order_id.0,
                "sales.order",
                &OrderCommand::CancelOrder(CancelOrder {
                    order_id,
                    occurred_at: Utc::now(),
                }),
                |id| Order::empty(OrderId::new(id)),
            )
            .unwrap_err();

        assert!(matches!(err, DispatchError::Domain(OrderError::NotFound)));
    }

    #[test]
    fn commit_at_stale_version_is_a_concurrency_error() {
        let (dispatcher, _bus) = setup();
        let order_id = OrderId::new(AggregateId::new());
        let make = |id| Order::empty(OrderId::new(id));

        let loaded = dispatcher.load(order_id.0, make).unwrap();
        let decided = loaded.aggregate.handle(&place_command(order_id)).unwrap();

        dispatcher
            .dispatch(order_id.0, "sales.order", &place_command(order_id), make)
            .unwrap();

        let err = dispatcher
            .commit(loaded.aggregate, order_id.0, "sales.order", loaded.expected, decided)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Concurrency(_)));
    }
}
