//! Service wiring: catalog, stock, order lifecycle, orders read model and the
//! background workers feeding it.

use std::sync::{Arc, Mutex};

use serde_json::Value as JsonValue;
use tracing::{info, warn};

use shopkeep_catalog::{CatalogProvider, Product, ProductId};
use shopkeep_events::{EventEnvelope, InMemoryEventBus};
use shopkeep_infra::{
    InMemoryCatalog, LifecycleError, OrderLifecycleManager,
    event_store::InMemoryEventStore,
    notifications::{LogNotifier, NotificationWorker},
    projections::{OrderFilter, OrdersProjection},
    read_model::InMemoryReadModelStore,
    workers::{ProjectionWorker, WorkerHandle},
};
use shopkeep_inventory::{InMemoryStockStore, InventoryError};
use shopkeep_sales::{Cart, CheckoutError, Order, OrderId, OrderSummary};

use shopkeep_core::Money;

pub type EnvelopeBus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
pub type SummaryBus = Arc<InMemoryEventBus<OrderSummary>>;
pub type Manager =
    OrderLifecycleManager<Arc<InMemoryEventStore>, EnvelopeBus, Arc<InMemoryStockStore>, SummaryBus>;
pub type Projection = OrdersProjection<Arc<InMemoryReadModelStore<OrderId, OrderSummary>>>;

pub struct AppServices {
    catalog: Arc<InMemoryCatalog>,
    manager: Arc<Manager>,
    projection: Arc<Projection>,
    summaries: SummaryBus,
    workers: Mutex<Vec<WorkerHandle>>,
}

impl core::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppServices").finish_non_exhaustive()
    }
}

/// In-memory wiring: store + buses + projection worker + notification worker.
pub fn build_services() -> AppServices {
    let stock = Arc::new(InMemoryStockStore::new());
    let catalog = Arc::new(InMemoryCatalog::new(stock.clone()));
    let envelopes: EnvelopeBus = Arc::new(InMemoryEventBus::new());
    let summaries: SummaryBus = Arc::new(InMemoryEventBus::new());

    let projection: Arc<Projection> =
        Arc::new(OrdersProjection::new(Arc::new(InMemoryReadModelStore::new())));

    // Background subscribers are registered before any command runs.
    let sink = projection.clone();
    let projection_worker = ProjectionWorker::spawn(
        "orders-projection",
        &*envelopes,
        move |env: EventEnvelope<JsonValue>| sink.apply_envelope(&env),
    );
    let notification_worker = NotificationWorker::spawn(&*summaries, LogNotifier);

    let manager = Arc::new(OrderLifecycleManager::new(
        Arc::new(InMemoryEventStore::new()),
        envelopes,
        stock,
        summaries.clone(),
    ));

    AppServices {
        catalog,
        manager,
        projection,
        summaries,
        workers: Mutex::new(vec![projection_worker, notification_worker]),
    }
}

impl AppServices {
    pub fn catalog(&self) -> &InMemoryCatalog {
        &self.catalog
    }

    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    /// Bus carrying summaries of freshly paid orders.
    pub fn summaries(&self) -> &SummaryBus {
        &self.summaries
    }

    pub fn seed_catalog(&self, products: Vec<Product>) -> Result<usize, InventoryError> {
        let count = products.len();
        for product in products {
            self.catalog.register(product)?;
        }
        info!(products = count, "catalog seeded");
        Ok(count)
    }

    pub fn get_product(&self, id: &ProductId) -> Option<Product> {
        self.catalog.get_product(id)
    }

    pub fn checkout(&self, cart: &mut Cart) -> Result<Order, CheckoutError<LifecycleError>> {
        cart.checkout(&*self.manager)
    }

    pub fn confirm(&self, id: OrderId, shipping_fee: Option<Money>) -> Result<Order, LifecycleError> {
        self.manager.confirm(id, shipping_fee)
    }

    pub fn cancel(&self, id: OrderId) -> Result<Order, LifecycleError> {
        self.manager.cancel(id)
    }

    /// Authoritative state, rehydrated from the event store.
    pub fn get_order(&self, id: OrderId) -> Result<Order, LifecycleError> {
        self.manager.get(id)
    }

    pub fn list_orders(&self, filter: &OrderFilter) -> Vec<OrderSummary> {
        self.projection.query(filter)
    }

    /// Stop background workers. Idempotent.
    pub fn shutdown(&self) {
        let handles = match self.workers.lock() {
            Ok(mut w) => std::mem::take(&mut *w),
            Err(_) => {
                warn!("worker registry poisoned; skipping shutdown");
                return;
            }
        };
        for handle in handles {
            handle.shutdown();
        }
    }
}
