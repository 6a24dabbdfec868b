//! Domain events: the event contract, stream envelopes and pub/sub mechanics.
//!
//! Events are facts decided by aggregates (`order.placed`, `order.confirmed`, ...).
//! The infra layer persists them first and then publishes envelopes on an
//! [`EventBus`] so read models and post-confirmation consumers can react.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use handler::execute;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
