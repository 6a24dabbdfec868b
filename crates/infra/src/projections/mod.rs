//! Projections (read model builders).
//!
//! Projections consume published event envelopes and build query-optimized read
//! models. They are:
//! - **Rebuildable**: can be reconstructed from the event store
//! - **Idempotent**: safe for at-least-once delivery (per-stream sequence cursors)

pub mod orders;

pub use orders::{OrderFilter, OrdersProjection, OrdersProjectionError};
