use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use shopkeep_catalog::ProductId;

/// One line of a stock movement: `quantity` units of `product_id`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl StockRequest {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// Authoritative check failed; nothing was decremented.
    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    StockInsufficient {
        product_id: ProductId,
        requested: u64,
        available: i64,
    },

    #[error("unknown product {0}")]
    UnknownProduct(ProductId),

    #[error("stock movement quantity must be positive")]
    InvalidQuantity,

    #[error("stock level lock poisoned")]
    Poisoned,
}

/// Authoritative stock levels.
///
/// Implementations must make `decrement_all` a single read-check-decrement unit:
/// either every request is applied or none is, and no other decrement touching one
/// of the same products may interleave with it.
pub trait StockStore: Send + Sync {
    /// Current level, or `None` when the product is not tracked.
    fn available(&self, product_id: &ProductId) -> Option<i64>;

    /// Decrement every request atomically, or fail without side effects.
    fn decrement_all(&self, requests: &[StockRequest]) -> Result<(), InventoryError>;

    /// Add stock back (receiving goods, or compensating a decrement).
    fn restock(&self, requests: &[StockRequest]) -> Result<(), InventoryError>;

    /// Single-line decrement.
    fn decrement(&self, product_id: ProductId, quantity: u32) -> Result<(), InventoryError> {
        self.decrement_all(&[StockRequest::new(product_id, quantity)])
    }
}

impl<S> StockStore for Arc<S>
where
    S: StockStore + ?Sized,
{
    fn available(&self, product_id: &ProductId) -> Option<i64> {
        (**self).available(product_id)
    }

    fn decrement_all(&self, requests: &[StockRequest]) -> Result<(), InventoryError> {
        (**self).decrement_all(requests)
    }

    fn restock(&self, requests: &[StockRequest]) -> Result<(), InventoryError> {
        (**self).restock(requests)
    }
}

/// In-process stock levels with one mutex per product.
///
/// `decrement_all` locks the involved products in ascending `ProductId` order, so two
/// orders sharing products always acquire locks in the same sequence and cannot
/// deadlock. The outer `RwLock` only guards the set of tracked products; it is
/// released before any per-product lock is taken.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    levels: RwLock<BTreeMap<ProductId, Arc<Mutex<i64>>>>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a product (or overwrite its level).
    pub fn set_level(&self, product_id: ProductId, level: i64) -> Result<(), InventoryError> {
        let level = level.max(0);
        let existing = {
            let mut levels = self.levels.write().map_err(|_| InventoryError::Poisoned)?;
            match levels.get(&product_id) {
                Some(cell) => Some(cell.clone()),
                None => {
                    levels.insert(product_id, Arc::new(Mutex::new(level)));
                    None
                }
            }
        };

        if let Some(cell) = existing {
            *cell.lock().map_err(|_| InventoryError::Poisoned)? = level;
        }
        Ok(())
    }

    /// Resolve the per-product cells for merged requests, in ascending id order.
    fn cells_for(
        &self,
        merged: &BTreeMap<ProductId, u64>,
    ) -> Result<Vec<(ProductId, u64, Arc<Mutex<i64>>)>, InventoryError> {
        let levels = self.levels.read().map_err(|_| InventoryError::Poisoned)?;
        merged
            .iter()
            .map(|(id, qty)| {
                levels
                    .get(id)
                    .cloned()
                    .map(|cell| (*id, *qty, cell))
                    .ok_or(InventoryError::UnknownProduct(*id))
            })
            .collect()
    }
}

/// Sum quantities per product; the BTreeMap fixes the lock order.
fn merge_requests(requests: &[StockRequest]) -> Result<BTreeMap<ProductId, u64>, InventoryError> {
    let mut merged = BTreeMap::new();
    for req in requests {
        if req.quantity == 0 {
            return Err(InventoryError::InvalidQuantity);
        }
        *merged.entry(req.product_id).or_insert(0u64) += u64::from(req.quantity);
    }
    Ok(merged)
}

fn as_level(quantity: u64) -> i64 {
    i64::try_from(quantity).unwrap_or(i64::MAX)
}

impl StockStore for InMemoryStockStore {
    fn available(&self, product_id: &ProductId) -> Option<i64> {
        let cell = self.levels.read().ok()?.get(product_id).cloned()?;
        let level = *cell.lock().ok()?;
        Some(level)
    }

    fn decrement_all(&self, requests: &[StockRequest]) -> Result<(), InventoryError> {
        let merged = merge_requests(requests)?;
        let cells = self.cells_for(&merged)?;

        let mut guards: Vec<(ProductId, u64, MutexGuard<'_, i64>)> = Vec::with_capacity(cells.len());
        for (id, qty, cell) in &cells {
            let guard = cell.lock().map_err(|_| InventoryError::Poisoned)?;
            guards.push((*id, *qty, guard));
        }

        // Check every line before touching any of them.
        for (id, qty, level) in &guards {
            if **level < as_level(*qty) {
                debug!(product_id = %id, requested = qty, available = **level, "stock check failed");
                return Err(InventoryError::StockInsufficient {
                    product_id: *id,
                    requested: *qty,
                    available: **level,
                });
            }
        }

        for (_, qty, level) in guards.iter_mut() {
            **level -= as_level(*qty);
        }

        debug!(lines = guards.len(), "stock decremented");
        Ok(())
    }

    fn restock(&self, requests: &[StockRequest]) -> Result<(), InventoryError> {
        let merged = merge_requests(requests)?;
        let cells = self.cells_for(&merged)?;

        for (id, qty, cell) in &cells {
            let mut level = cell.lock().map_err(|_| InventoryError::Poisoned)?;
            *level = level.saturating_add(as_level(*qty));
            info!(product_id = %id, added = qty, level = *level, "stock restocked");
        }
        Ok(())
    }
}
