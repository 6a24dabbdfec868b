use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use shopkeep_infra::LifecycleError;
use shopkeep_inventory::InventoryError;
use shopkeep_sales::{CartError, CheckoutError, OrderError, PricingError};

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn bad_request(code: &'static str, message: impl Into<String>) -> Response {
    json_error(StatusCode::BAD_REQUEST, code, message)
}

pub fn not_found(message: impl Into<String>) -> Response {
    json_error(StatusCode::NOT_FOUND, "not_found", message)
}

pub fn pricing_error_to_response(err: PricingError) -> Response {
    let msg = err.to_string();
    match err {
        PricingError::PaymentAmountInsufficient { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "payment_amount_insufficient", msg)
        }
        PricingError::InvalidDiscount(_) => bad_request("invalid_discount", msg),
        PricingError::InvalidShippingFee(_) => bad_request("invalid_shipping_fee", msg),
        PricingError::AmountOverflow => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "amount_overflow", msg)
        }
    }
}

pub fn inventory_error_to_response(err: InventoryError) -> Response {
    let msg = err.to_string();
    match err {
        InventoryError::StockInsufficient { .. } => {
            json_error(StatusCode::CONFLICT, "stock_insufficient", msg)
        }
        InventoryError::UnknownProduct(_) => not_found(msg),
        InventoryError::InvalidQuantity => bad_request("invalid_quantity", msg),
        InventoryError::Poisoned => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
        }
    }
}

pub fn cart_error_to_response(err: CartError) -> Response {
    let msg = err.to_string();
    match err {
        CartError::InvalidQuantity => bad_request("invalid_quantity", msg),
        CartError::StockExceeded { .. } => json_error(StatusCode::CONFLICT, "stock_exceeded", msg),
        CartError::LineNotFound(_) => not_found(msg),
        CartError::Pricing(e) => pricing_error_to_response(e),
    }
}

pub fn lifecycle_error_to_response(err: LifecycleError) -> Response {
    let msg = err.to_string();
    match err {
        LifecycleError::Order(OrderError::NotFound) => not_found("order not found"),
        LifecycleError::Order(OrderError::InvalidTransition { .. }) => {
            json_error(StatusCode::CONFLICT, "invalid_transition", msg)
        }
        LifecycleError::Order(OrderError::AlreadyExists) => {
            json_error(StatusCode::CONFLICT, "already_exists", msg)
        }
        LifecycleError::Order(OrderError::Validation(_)) => bad_request("validation_error", msg),
        LifecycleError::Order(OrderError::Payment(e)) => pricing_error_to_response(e),
        LifecycleError::Stock(e) => inventory_error_to_response(e),
        LifecycleError::Concurrency(_) => json_error(StatusCode::CONFLICT, "conflict", msg),
        LifecycleError::Persistence(_) | LifecycleError::Poisoned => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
        }
    }
}

pub fn checkout_error_to_response(err: CheckoutError<LifecycleError>) -> Response {
    match err {
        CheckoutError::NotReady(missing) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            axum::Json(json!({
                "error": "checkout_not_ready",
                "message": format!(
                    "checkout not ready, missing: {}",
                    missing.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
                ),
                "missing": missing,
            })),
        )
            .into_response(),
        CheckoutError::Payment(e) => pricing_error_to_response(e),
        CheckoutError::Placement(e) => lifecycle_error_to_response(e),
    }
}
