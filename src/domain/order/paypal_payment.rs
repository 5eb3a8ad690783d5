//! PayPal slices: create a provider order for an order's total, then capture and verify it.

use std::str::FromStr;

use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use sqlx::{PgPool, types::Json as JsonColumn};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    domain::OrderId,
    infra::{ActionResult, AuthUser, ClientError, SessionUser},
    providers::{PayPalCapture, PayPalClient},
};

use super::{Order, OrderError, PaymentResult, confirm_payment, payable_order};

//------------------------- Web API ----------------------------

pub async fn create_paypal_order_endpoint(
    AuthUser(user): AuthUser,
    State(pool): State<PgPool>,
    State(paypal): State<PayPalClient>,
    Path(order_uuid): Path<Uuid>,
) -> Result<ActionResult<String>, ClientError> {
    let order_id: OrderId = order_uuid.try_into()?;
    let paypal_order_id = create_paypal_order(&pool, &paypal, &user, order_id).await?;
    info!("PayPal order {paypal_order_id} requested by {}", user.user_id);
    Ok(ActionResult::with_data(
        "Order created successfully.",
        paypal_order_id,
    ))
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApprovePayPalPayload {
    #[serde(rename = "orderID")]
    pub paypal_order_id: String,
}

pub async fn approve_paypal_order_endpoint(
    AuthUser(user): AuthUser,
    State(pool): State<PgPool>,
    State(paypal): State<PayPalClient>,
    Path(order_uuid): Path<Uuid>,
    Json(payload): Json<ApprovePayPalPayload>,
) -> Result<ActionResult, ClientError> {
    let order_id: OrderId = order_uuid.try_into()?;
    approve_paypal_order(&pool, &paypal, &user, order_id, &payload.paypal_order_id).await?;
    Ok(ActionResult::ok("Your order has been paid"))
}

//----------------------- Implementation --------------------------

/// Creates the PayPal order and remembers its id so the capture can be matched later.
pub async fn create_paypal_order(
    pool: &PgPool,
    paypal: &PayPalClient,
    viewer: &SessionUser,
    order_id: OrderId,
) -> Result<String, ClientError> {
    let order = payable_order(pool, viewer, order_id).await?;

    let paypal_order = paypal.create_order(order.prices.total_price).await?;

    sqlx::query("UPDATE orders SET payment_result = $2 WHERE order_id = $1")
        .bind(order_id)
        .bind(JsonColumn(PaymentResult::pending(&paypal_order.id)))
        .execute(pool)
        .await
        .with_context(|| format!("Problem storing PayPal order of order {order_id}."))?;

    Ok(paypal_order.id)
}

pub async fn approve_paypal_order(
    pool: &PgPool,
    paypal: &PayPalClient,
    viewer: &SessionUser,
    order_id: OrderId,
    paypal_order_id: &str,
) -> Result<Order, ClientError> {
    let order = payable_order(pool, viewer, order_id).await?;

    let capture = paypal.capture_payment(paypal_order_id).await?;
    let expected_id = order.payment_result.as_ref().map(|result| result.id.as_str());
    let payment_result = verify_capture(&capture, expected_id)?;

    confirm_payment(pool, order_id, Some(payment_result)).await
}

/// A capture counts only when it completed and belongs to the PayPal order created for this
/// order.
pub fn verify_capture(
    capture: &PayPalCapture,
    expected_id: Option<&str>,
) -> Result<PaymentResult, OrderError> {
    if expected_id != Some(capture.id.as_str()) || capture.status != "COMPLETED" {
        warn!(
            "PayPal capture {} with status {} does not match {expected_id:?}",
            capture.id, capture.status
        );
        return Err(OrderError::PaymentNotVerified);
    }
    let price_paid = capture
        .captured_value()
        .and_then(|value| Decimal::from_str(value).ok())
        .unwrap_or_default();
    Ok(PaymentResult {
        id: capture.id.clone(),
        status: capture.status.clone(),
        email_address: capture.payer_email().unwrap_or_default().to_owned(),
        price_paid,
    })
}

//-------------------------- Tests -------------------------------

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn capture(id: &str, status: &str) -> PayPalCapture {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "status": status,
            "payer": { "email_address": "buyer@example.com" },
            "purchase_units": [{
                "payments": { "captures": [{ "amount": { "value": "107.75" } }] }
            }]
        }))
        .expect("Capture should parse.")
    }

    #[test]
    fn completed_captures_of_the_stored_order_are_accepted() {
        let result = verify_capture(&capture("PP-1", "COMPLETED"), Some("PP-1"))
            .expect("Capture should verify.");

        assert_eq!(result.id, "PP-1");
        assert_eq!(result.status, "COMPLETED");
        assert_eq!(result.email_address, "buyer@example.com");
        assert_eq!(result.price_paid, dec!(107.75));
    }

    #[test]
    fn mismatched_or_incomplete_captures_are_rejected() {
        assert_eq!(
            verify_capture(&capture("PP-2", "COMPLETED"), Some("PP-1")),
            Err(OrderError::PaymentNotVerified)
        );
        assert_eq!(
            verify_capture(&capture("PP-1", "PENDING"), Some("PP-1")),
            Err(OrderError::PaymentNotVerified)
        );
        assert_eq!(
            verify_capture(&capture("PP-1", "COMPLETED"), None),
            Err(OrderError::PaymentNotVerified)
        );
    }
}
