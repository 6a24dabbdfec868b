//! Integration tests for the full sale pipeline.
//!
//! Tests: Cart → OrderLifecycleManager → EventStore → EventBus → Projection → ReadModel
//!
//! Verifies:
//! - A checked-out cart becomes a pending order visible in the read model
//! - Confirmation deducts stock and notifies downstream consumers
//! - Concurrent confirmations never oversell a product
//! - The read model can be rebuilt from the event store

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::{Duration, Instant};

    use proptest::prelude::*;
    use serde_json::Value as JsonValue;

    use shopkeep_catalog::{CatalogProvider, Product, ProductId};
    use shopkeep_core::{AggregateId, ClientId, Money};
    use shopkeep_events::{EventBus, EventEnvelope, InMemoryEventBus};
    use shopkeep_inventory::{InMemoryStockStore, InventoryError, StockStore};
    use shopkeep_sales::{
        Cart, DiscountSpec, OrderId, OrderStatus, OrderSummary, PaymentMethod, ShippingSelection,
    };

    use crate::catalog::InMemoryCatalog;
    use crate::event_store::{EventStore, InMemoryEventStore};
    use crate::lifecycle::{LifecycleError, ORDER_AGGREGATE_TYPE, OrderLifecycleManager};
    use crate::notifications::{NotificationWorker, NotifyError};
    use crate::projections::{OrderFilter, OrdersProjection};
    use crate::read_model::InMemoryReadModelStore;
    use crate::workers::{ProjectionWorker, WorkerHandle};

    type EnvelopeBus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
    type SummaryBus = Arc<InMemoryEventBus<OrderSummary>>;
    type Manager =
        OrderLifecycleManager<InMemoryEventStore, EnvelopeBus, Arc<InMemoryStockStore>, SummaryBus>;
    type Projection = OrdersProjection<Arc<InMemoryReadModelStore<OrderId, OrderSummary>>>;

    struct Harness {
        catalog: InMemoryCatalog,
        manager: Arc<Manager>,
        projection: Arc<Projection>,
        summaries: SummaryBus,
        worker: WorkerHandle,
    }

    fn setup() -> Harness {
        let stock = Arc::new(InMemoryStockStore::new());
        let catalog = InMemoryCatalog::new(stock.clone());
        let envelopes: EnvelopeBus = Arc::new(InMemoryEventBus::new());
        let summaries: SummaryBus = Arc::new(InMemoryEventBus::new());
        let projection: Arc<Projection> =
            Arc::new(OrdersProjection::new(Arc::new(InMemoryReadModelStore::new())));

        // Subscribe before anything is published.
        let sink = projection.clone();
        let worker = ProjectionWorker::spawn("orders-projection", &*envelopes, move |env: EventEnvelope<JsonValue>| {
            sink.apply_envelope(&env)
        });

        let manager = Arc::new(OrderLifecycleManager::new(
            InMemoryEventStore::new(),
            envelopes,
            stock,
            summaries.clone(),
        ));

        Harness {
            catalog,
            manager,
            projection,
            summaries,
            worker,
        }
    }

    fn register(catalog: &InMemoryCatalog, name: &str, price: Money, stock: i64) -> Product {
        catalog
            .register(Product::new(ProductId::new(AggregateId::new()), name, price, None, stock).unwrap())
            .unwrap()
    }

    /// Projections are eventually consistent; poll until `check` holds.
    fn wait_for(projection: &Projection, order_id: OrderId, check: impl Fn(&OrderSummary) -> bool) -> OrderSummary {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            if let Some(s) = projection.get(&order_id) {
                if check(&s) {
                    return s;
                }
            }
            assert!(Instant::now() < deadline, "projection did not catch up");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn checkout_and_confirm_flow_updates_stock_read_model_and_notifies() {
        let h = setup();
        let (tx, rx) = mpsc::channel();
        let notifier = NotificationWorker::spawn(&*h.summaries, move |s: &OrderSummary| {
            tx.send(s.clone()).map_err(|e| NotifyError::Delivery(e.to_string()))
        });

        let candle = register(&h.catalog, "Candle", Money::from_major(30), 5);
        let soap = register(&h.catalog, "Soap", Money::from_minor(450), 10);
        let client = ClientId::new();

        let mut cart = Cart::new();
        cart.add(&h.catalog.get_product(&candle.id_typed()).unwrap(), 2).unwrap();
        cart.add(&soap, 4).unwrap();
        cart.set_client(client);
        cart.set_discount(DiscountSpec::fixed(Money::from_major(8)).unwrap()).unwrap();
        cart.set_shipping(ShippingSelection::Fee10).unwrap();
        cart.set_payment(PaymentMethod::cash(Money::from_major(100))).unwrap();

        let order = cart.checkout(&*h.manager).unwrap();
        assert!(cart.is_empty());
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.subtotal(), Money::from_major(78));
        assert_eq!(order.total(), Money::from_major(80));
        assert_eq!(order.change(), Some(Money::from_major(20)));
        assert_eq!(h.catalog.get_product(&candle.id_typed()).unwrap().stock(), 5);

        let order_id = order.id_typed();
        wait_for(&h.projection, order_id, |s| s.status == OrderStatus::Pending);

        h.manager.confirm(order_id, None).unwrap();

        assert_eq!(h.catalog.get_product(&candle.id_typed()).unwrap().stock(), 3);
        assert_eq!(h.catalog.get_product(&soap.id_typed()).unwrap().stock(), 6);

        let summary = wait_for(&h.projection, order_id, |s| s.status == OrderStatus::Paid);
        assert_eq!(summary.client_id, client);
        assert_eq!(summary.amount_due, Money::from_major(80));
        assert_eq!(summary.item_count(), 6);

        let notified = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(notified.order_id, order_id);
        assert_eq!(notified.status, OrderStatus::Paid);

        notifier.shutdown();
        h.worker.shutdown();
    }

    #[test]
    fn cancelled_order_keeps_stock_and_is_queryable_by_status() {
        let h = setup();
        let pen = register(&h.catalog, "Pen", Money::from_major(2), 3);

        let mut cart = Cart::new();
        cart.add(&pen, 3).unwrap();
        cart.set_client(ClientId::new());
        cart.set_payment(PaymentMethod::Pix).unwrap();
        let order = cart.checkout(&*h.manager).unwrap();

        h.manager.cancel(order.id_typed()).unwrap();
        wait_for(&h.projection, order.id_typed(), |s| s.status == OrderStatus::Cancelled);

        assert_eq!(h.catalog.get_product(&pen.id_typed()).unwrap().stock(), 3);
        let cancelled = h.projection.query(&OrderFilter {
            status: Some(OrderStatus::Cancelled),
            ..Default::default()
        });
        assert_eq!(cancelled.len(), 1);
        assert!(h.projection.query(&OrderFilter {
            status: Some(OrderStatus::Paid),
            ..Default::default()
        })
        .is_empty());

        h.worker.shutdown();
    }

    #[test]
    fn stale_cart_stock_is_caught_at_confirmation() {
        let h = setup();
        let lamp = register(&h.catalog, "Lamp", Money::from_major(50), 2);

        let checkout = |qty: i64| {
            let mut cart = Cart::new();
            cart.add(&lamp, qty).unwrap();
            cart.set_client(ClientId::new());
            cart.set_payment(PaymentMethod::CreditCard).unwrap();
            cart.checkout(&*h.manager).unwrap()
        };
        let first = checkout(2);
        let second = checkout(1);

        h.manager.confirm(first.id_typed(), None).unwrap();
        let err = h.manager.confirm(second.id_typed(), None).unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::Stock(InventoryError::StockInsufficient { available: 0, .. })
        ));
        assert_eq!(
            h.manager.get(second.id_typed()).unwrap().status(),
            OrderStatus::Pending
        );
        h.worker.shutdown();
    }

    #[test]
    fn read_model_rebuilds_from_event_store() {
        let h = setup();
        let mug = register(&h.catalog, "Mug", Money::from_major(12), 10);

        let mut ids = vec![];
        for qty in 1..=3 {
            let mut cart = Cart::new();
            cart.add(&mug, qty).unwrap();
            cart.set_client(ClientId::new());
            cart.set_payment(PaymentMethod::DebitCard).unwrap();
            ids.push(cart.checkout(&*h.manager).unwrap().id_typed());
        }
        h.manager.confirm(ids[0], None).unwrap();
        h.manager.cancel(ids[1]).unwrap();
        h.worker.shutdown();

        let fresh: Projection = OrdersProjection::new(Arc::new(InMemoryReadModelStore::new()));
        let envelopes = h
            .manager
            .event_store()
            .load_all(ORDER_AGGREGATE_TYPE)
            .unwrap()
            .iter()
            .map(|e| e.to_envelope())
            .collect::<Vec<_>>();
        fresh.rebuild_from_scratch(envelopes).unwrap();

        let statuses: Vec<_> = ids
            .iter()
            .map(|id| fresh.get(id).unwrap().status)
            .collect();
        assert_eq!(
            statuses,
            vec![OrderStatus::Paid, OrderStatus::Cancelled, OrderStatus::Pending]
        );
    }

    #[test]
    fn two_concurrent_confirmations_for_scarce_stock() {
        let h = setup();
        let scarf = register(&h.catalog, "Scarf", Money::from_major(40), 5);

        let ids: Vec<OrderId> = (0..2)
            .map(|_| {
                let mut cart = Cart::new();
                cart.add(&scarf, 3).unwrap();
                cart.set_client(ClientId::new());
                cart.set_payment(PaymentMethod::Pix).unwrap();
                cart.checkout(&*h.manager).unwrap().id_typed()
            })
            .collect();

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = ids
            .iter()
            .map(|id| {
                let (manager, barrier, id) = (h.manager.clone(), barrier.clone(), *id);
                thread::spawn(move || {
                    barrier.wait();
                    manager.confirm(id, None)
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|j| j.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(LifecycleError::Stock(InventoryError::StockInsufficient {
                requested: 3,
                available: 2,
                ..
            }))
        )));
        assert_eq!(h.catalog.get_product(&scarf.id_typed()).unwrap().stock(), 2);
        h.worker.shutdown();
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn concurrent_confirmations_never_oversell(
            initial in 0i64..20,
            quantities in prop::collection::vec(1u32..6, 1..8),
        ) {
            let stock = Arc::new(InMemoryStockStore::new());
            let product = ProductId::new(AggregateId::new());
            stock.set_level(product, initial).unwrap();
            let manager = Arc::new(OrderLifecycleManager::new(
                InMemoryEventStore::new(),
                Arc::new(InMemoryEventBus::<EventEnvelope<JsonValue>>::new()),
                stock.clone(),
                Arc::new(InMemoryEventBus::<OrderSummary>::new()),
            ));
            let catalog = InMemoryCatalog::new(stock.clone());
            let item = catalog
                .register(Product::new(product, "Item", Money::from_major(1), None, initial).unwrap())
                .unwrap();

            let ids: Vec<OrderId> = quantities
                .iter()
                .map(|q| {
                    let mut cart = Cart::new();
                    // Advisory check only looks at the cart's own lines.
                    cart.add(&item.clone().with_stock(i64::MAX), i64::from(*q)).unwrap();
                    cart.set_client(ClientId::new());
                    cart.set_payment(PaymentMethod::Pix).unwrap();
                    cart.checkout(&*manager).unwrap().id_typed()
                })
                .collect();

            let handles: Vec<_> = ids
                .iter()
                .map(|id| {
                    let (manager, id) = (manager.clone(), *id);
                    thread::spawn(move || manager.confirm(id, None))
                })
                .collect();

            let confirmed: u64 = handles
                .into_iter()
                .zip(&quantities)
                .filter_map(|(j, q)| j.join().unwrap().ok().map(|_| u64::from(*q)))
                .sum();

            let remaining = stock.available(&product).unwrap();
            prop_assert!(remaining >= 0);
            prop_assert_eq!(remaining, initial - confirmed as i64);
        }
    }

    #[test]
    fn summary_bus_failure_does_not_fail_confirmation() {
        #[derive(Debug)]
        struct ClosedBus;

        impl EventBus<OrderSummary> for ClosedBus {
            type Error = &'static str;

            fn publish(&self, _message: OrderSummary) -> Result<(), Self::Error> {
                Err("closed")
            }

            fn subscribe(&self) -> shopkeep_events::Subscription<OrderSummary> {
                let (_tx, rx) = mpsc::channel();
                shopkeep_events::Subscription::new(rx)
            }
        }

        let stock = Arc::new(InMemoryStockStore::new());
        let catalog = InMemoryCatalog::new(stock.clone());
        let gift = register(&catalog, "Gift", Money::from_major(5), 1);
        let manager = OrderLifecycleManager::new(
            InMemoryEventStore::new(),
            Arc::new(InMemoryEventBus::<EventEnvelope<JsonValue>>::new()),
            stock.clone(),
            ClosedBus,
        );

        let mut cart = Cart::new();
        cart.add(&gift, 1).unwrap();
        cart.set_client(ClientId::new());
        cart.set_payment(PaymentMethod::BankTransfer).unwrap();
        let order = cart.checkout(&manager).unwrap();

        let paid = manager.confirm(order.id_typed(), None).unwrap();
        assert_eq!(paid.status(), OrderStatus::Paid);
        assert_eq!(stock.available(&gift.id_typed()), Some(0));
    }
}
