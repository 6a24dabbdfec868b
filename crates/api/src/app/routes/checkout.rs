use std::sync::Arc;

use axum::{
    Json, Router, extract::Extension, http::StatusCode, response::IntoResponse, routing::post,
};

use shopkeep_catalog::ProductId;
use shopkeep_sales::Cart;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", post(checkout))
}

/// Build a cart from the request against the current catalog and check it out.
pub async fn checkout(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CheckoutRequest>,
) -> axum::response::Response {
    let mut cart = match build_cart(&services, body) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match services.checkout(&mut cart) {
        Ok(order) => (StatusCode::CREATED, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::checkout_error_to_response(e),
    }
}

fn build_cart(
    services: &AppServices,
    body: dto::CheckoutRequest,
) -> Result<Cart, axum::response::Response> {
    let mut cart = Cart::new();

    for line in &body.lines {
        let product_id: ProductId = line
            .product_id
            .parse()
            .map_err(|_| errors::bad_request("invalid_id", "invalid product id"))?;
        let product = services
            .get_product(&product_id)
            .ok_or_else(|| errors::not_found(format!("product {product_id} not found")))?;
        cart.add(&product, line.quantity)
            .map_err(errors::cart_error_to_response)?;
    }

    if let Some(client_id) = body.client_id {
        cart.set_client(client_id);
    }
    cart.set_discount(body.discount)
        .map_err(errors::cart_error_to_response)?;
    cart.set_shipping(body.shipping)
        .map_err(errors::cart_error_to_response)?;
    if let Some(payment) = body.payment {
        cart.set_payment(payment)
            .map_err(errors::cart_error_to_response)?;
    }
    Ok(cart)
}
