//! Post-confirmation notification hook.
//!
//! The lifecycle manager publishes an `OrderSummary` on a dedicated bus after an
//! order is paid. A worker drains that bus and hands each summary to a
//! [`Notifier`]. Delivery failures are logged here and never reach the order.

use thiserror::Error;
use tracing::info;

use shopkeep_events::EventBus;
use shopkeep_sales::OrderSummary;

use crate::workers::{ProjectionWorker, WorkerHandle};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Downstream consumer of finalized orders (customer message, printable receipt).
pub trait Notifier: Send {
    fn notify(&mut self, summary: &OrderSummary) -> Result<(), NotifyError>;
}

impl<F> Notifier for F
where
    F: FnMut(&OrderSummary) -> Result<(), NotifyError> + Send,
{
    fn notify(&mut self, summary: &OrderSummary) -> Result<(), NotifyError> {
        self(summary)
    }
}

/// Writes a receipt for every paid order to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, summary: &OrderSummary) -> Result<(), NotifyError> {
        info!(
            order_id = %summary.order_id,
            client_id = %summary.client_id,
            amount_due = %summary.amount_due,
            payment_method = summary.payment_method.label(),
            receipt = %render_receipt(summary),
            "order receipt"
        );
        Ok(())
    }
}

/// Plain-text receipt.
pub fn render_receipt(summary: &OrderSummary) -> String {
    let mut out = vec![format!("Order {}", summary.order_id)];
    out.extend(summary.lines.iter().map(|line| {
        format!(
            "{} x{} @ {} = {}",
            line.product_name,
            line.quantity,
            line.unit_price,
            line.line_total()
        )
    }));
    out.push(format!("Subtotal: {}", summary.subtotal));
    if summary.discount_amount.is_positive() {
        out.push(format!("Discount: -{}", summary.discount_amount));
    }
    out.push(format!("Shipping: {}", summary.shipping_fee_charged));
    out.push(format!("Total: {}", summary.amount_due));

    let mut payment = format!("Payment: {}", summary.payment_method.label());
    if let (Some(paid), Some(change)) = (summary.paid_amount, summary.change) {
        payment.push_str(&format!(" (paid {paid}, change {change})"));
    }
    out.push(payment);
    out.join("\n")
}

/// Runs a [`Notifier`] on its own thread.
#[derive(Debug)]
pub struct NotificationWorker;

impl NotificationWorker {
    pub fn spawn<B, N>(bus: &B, mut notifier: N) -> WorkerHandle
    where
        B: EventBus<OrderSummary> + ?Sized,
        N: Notifier + 'static,
    {
        ProjectionWorker::spawn("order-notifications", bus, move |summary: OrderSummary| {
            notifier.notify(&summary)
        })
    }
}
