//! Inventory domain module: authoritative stock levels.
//!
//! The cart only ever sees a possibly stale stock reading. This crate owns the
//! authoritative levels and the single-writer arbitration used when an order is
//! confirmed: every line of one order is checked and decremented as a unit, and
//! decrements touching the same product are mutually exclusive.

pub mod stock;

pub use stock::{InMemoryStockStore, InventoryError, StockRequest, StockStore};
