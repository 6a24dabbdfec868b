//! Infrastructure layer: event store, buses, read models, workers and the order
//! lifecycle manager that ties them to the stock store.

pub mod catalog;
pub mod command_dispatcher;
pub mod event_store;
pub mod lifecycle;
pub mod notifications;
pub mod projections;
pub mod read_model;
pub mod workers;

pub use catalog::InMemoryCatalog;
pub use lifecycle::{LifecycleError, ORDER_AGGREGATE_TYPE, OrderLifecycleManager};

#[cfg(test)]
mod integration_tests;
