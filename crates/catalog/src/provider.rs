use std::sync::Arc;

use crate::product::{Product, ProductId};

/// Read-only source of product records.
///
/// The returned `stock` is a point-in-time read: good enough for the cart's advisory
/// check, never for the authoritative deduction performed at confirmation.
pub trait CatalogProvider: Send + Sync {
    fn get_product(&self, id: &ProductId) -> Option<Product>;
}

impl<C> CatalogProvider for Arc<C>
where
    C: CatalogProvider + ?Sized,
{
    fn get_product(&self, id: &ProductId) -> Option<Product> {
        (**self).get_product(id)
    }
}
