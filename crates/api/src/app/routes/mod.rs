use axum::{Router, routing::get};

pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod system;

/// Router for every sale-engine endpoint.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/products", catalog::router())
        .nest("/checkout", checkout::router())
        .nest("/orders", orders::router())
}
