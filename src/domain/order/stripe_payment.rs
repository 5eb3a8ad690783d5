//! Stripe slices: a payment intent for the order's total, and the signed webhook that
//! confirms the charge.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    domain::OrderId,
    infra::{AuthUser, ClientError, SessionUser},
    providers::{PaymentIntent, StripeClient, amount_in_cents},
};

use super::{PaymentResult, confirm_payment, payable_order};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

//------------------------- Web API ----------------------------

pub async fn create_payment_intent_endpoint(
    AuthUser(user): AuthUser,
    State(pool): State<PgPool>,
    State(stripe): State<StripeClient>,
    Path(order_uuid): Path<Uuid>,
) -> Result<Json<PaymentIntent>, ClientError> {
    let order_id: OrderId = order_uuid.try_into()?;
    Ok(Json(create_payment_intent(&pool, &stripe, &user, order_id).await?))
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct WebhookReceived {
    pub received: bool,
}

pub async fn stripe_webhook_endpoint(
    State(pool): State<PgPool>,
    State(stripe): State<StripeClient>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookReceived>, ClientError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ClientError::Validation("Missing Stripe signature.".to_owned()))?;
    stripe.verify_webhook(signature, &body).map_err(|e| {
        warn!("Rejected Stripe webhook: {e}");
        ClientError::Validation("Invalid Stripe signature.".to_owned())
    })?;

    let event: StripeEvent = serde_json::from_slice(&body)
        .map_err(|e| ClientError::Validation(format!("Malformed Stripe event: {e}")))?;
    handle_stripe_event(&pool, event).await?;
    Ok(Json(WebhookReceived { received: true }))
}

//----------------------- Implementation --------------------------

pub async fn create_payment_intent(
    pool: &PgPool,
    stripe: &StripeClient,
    viewer: &SessionUser,
    order_id: OrderId,
) -> Result<PaymentIntent, ClientError> {
    let order = payable_order(pool, viewer, order_id).await?;

    let amount = amount_in_cents(order.prices.total_price).ok_or_else(|| {
        anyhow::anyhow!("Total {} of order {order_id} does not fit in cents.", order.prices.total_price)
    })?;
    Ok(stripe.create_payment_intent(amount, order_id).await?)
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct StripeEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct StripeEventData {
    pub object: StripeCharge,
}

/// Only the fields of a charge the storefront records. Other event objects parse with
/// defaults and are ignored.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct StripeCharge {
    pub id: String,
    pub amount: i64,
    pub metadata: ChargeMetadata,
    pub billing_details: BillingDetails,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct ChargeMetadata {
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct BillingDetails {
    pub email: Option<String>,
}

/// The order a succeeded charge pays for, with the payment to record. `None` for any other
/// event.
pub fn charge_payment(event: &StripeEvent) -> Result<Option<(OrderId, PaymentResult)>, ClientError> {
    if event.event_type != "charge.succeeded" {
        return Ok(None);
    }
    let charge = &event.data.object;
    let order_id: OrderId = charge
        .metadata
        .order_id
        .as_deref()
        .ok_or_else(|| ClientError::Validation("Charge carries no order id.".to_owned()))?
        .parse()?;

    Ok(Some((
        order_id,
        PaymentResult {
            id: charge.id.clone(),
            status: "COMPLETED".to_owned(),
            email_address: charge.billing_details.email.clone().unwrap_or_default(),
            price_paid: Decimal::new(charge.amount, 2),
        },
    )))
}

pub async fn handle_stripe_event(pool: &PgPool, event: StripeEvent) -> Result<(), ClientError> {
    let Some((order_id, payment_result)) = charge_payment(&event)? else {
        debug!("Ignoring Stripe event {}", event.event_type);
        return Ok(());
    };
    confirm_payment(pool, order_id, Some(payment_result)).await?;
    info!("Stripe charge confirmed payment of order {order_id}");
    Ok(())
}

//-------------------------- Tests -------------------------------
