//! Catalog domain module.
//!
//! Product records as the sale engine sees them: list price, optional promotional
//! price and the last-known stock level. Product CRUD lives elsewhere; this crate
//! only defines the record and the read-only [`CatalogProvider`] boundary.

pub mod product;
pub mod provider;

pub use product::{Product, ProductId};
pub use provider::CatalogProvider;
