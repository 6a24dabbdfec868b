//! In-memory catalog adapter.
//!
//! Product records live here; their stock lives in the shared stock store so the
//! cart's reads and the lifecycle manager's decrements see the same levels.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use shopkeep_catalog::{CatalogProvider, Product, ProductId};
use shopkeep_inventory::{InMemoryStockStore, InventoryError, StockRequest, StockStore};

#[derive(Debug)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, Product>>,
    stock: Arc<InMemoryStockStore>,
}

impl InMemoryCatalog {
    pub fn new(stock: Arc<InMemoryStockStore>) -> Self {
        Self {
            products: RwLock::new(HashMap::new()),
            stock,
        }
    }

    /// Add or replace a product; its `stock` becomes the authoritative level.
    pub fn register(&self, product: Product) -> Result<Product, InventoryError> {
        let id = product.id_typed();
        self.stock.set_level(id, product.stock())?;
        self.products
            .write()
            .map_err(|_| InventoryError::Poisoned)?
            .insert(id, product.clone());

        info!(product_id = %id, name = product.name(), stock = product.stock(), "product registered");
        Ok(product)
    }

    /// Add stock to a registered product and return the refreshed record.
    pub fn restock(&self, product_id: ProductId, quantity: u32) -> Result<Product, InventoryError> {
        if !self.contains(&product_id) {
            return Err(InventoryError::UnknownProduct(product_id));
        }
        self.stock.restock(&[StockRequest::new(product_id, quantity)])?;
        self.get_product(&product_id)
            .ok_or(InventoryError::UnknownProduct(product_id))
    }

    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.products
            .read()
            .map(|p| p.contains_key(product_id))
            .unwrap_or(false)
    }

    /// Every product with current stock, sorted by name.
    pub fn list(&self) -> Vec<Product> {
        let ids: Vec<ProductId> = match self.products.read() {
            Ok(p) => p.keys().copied().collect(),
            Err(_) => return vec![],
        };
        let mut products: Vec<Product> = ids.iter().filter_map(|id| self.get_product(id)).collect();
        products.sort_by(|a, b| a.name().cmp(b.name()));
        products
    }
}

impl CatalogProvider for InMemoryCatalog {
    fn get_product(&self, id: &ProductId) -> Option<Product> {
        let product = self.products.read().ok()?.get(id).cloned()?;
        let stock = self.stock.available(id).unwrap_or(product.stock());
        Some(product.with_stock(stock))
    }
}
