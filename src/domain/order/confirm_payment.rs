//! Confirm Payment slice
//!
//! The single place stock is decremented. Every payment path ends here: the PayPal capture,
//! the Stripe webhook and the admin marking a cash-on-delivery order as paid.

use anyhow::Context;
use axum::extract::{Path, State};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    domain::{OrderId, ProductId},
    infra::{ActionResult, AdminUser, ClientError},
    subsystems::work_queue::WorkQueue,
};

use super::{Order, OrderError, PaymentResult, find_order, receipt::receipt_task, save_order_status};

//------------------------- Web API ----------------------------

/// Cash on delivery: the admin records the payment once the courier has collected it.
pub async fn mark_paid_endpoint(
    AdminUser(admin): AdminUser,
    State(pool): State<PgPool>,
    Path(order_uuid): Path<Uuid>,
) -> Result<ActionResult, ClientError> {
    let order_id: OrderId = order_uuid.try_into()?;
    confirm_payment(&pool, order_id, None).await?;
    info!("Order {order_id} marked as paid by {}", admin.user_id);
    Ok(ActionResult::ok("Order marked as paid."))
}

//----------------------- Implementation --------------------------

/// Locks the order, decrements stock for each line, marks it paid and queues the purchase
/// receipt. The receipt task commits with the payment.
pub async fn confirm_payment(
    pool: &PgPool,
    order_id: OrderId,
    payment_result: Option<PaymentResult>,
) -> Result<Order, ClientError> {
    let mut tx = pool
        .begin()
        .await
        .context("Problem starting payment transaction.")?;

    let mut order = find_order(&mut tx, order_id, true)
        .await?
        .ok_or(OrderError::OrderNotFound)?;
    order.mark_paid(payment_result, jiff::Timestamp::now())?;

    for item in &order.items {
        decrement_stock(&mut tx, item.product_id, item.quantity).await?;
    }
    save_order_status(&mut tx, &order).await?;
    WorkQueue::push_with(&mut tx, receipt_task(order_id))
        .await
        .with_context(|| format!("Problem queueing receipt for order {order_id}."))?;

    tx.commit().await.context("Problem committing payment.")?;

    info!("Order {order_id} paid");
    Ok(order)
}

/// No floor: stock may go negative when orders oversell.
async fn decrement_stock(
    conn: &mut sqlx::PgConnection,
    product_id: ProductId,
    quantity: u32,
) -> Result<(), anyhow::Error> {
    let result = sqlx::query("UPDATE products SET stock = stock - $2 WHERE product_id = $1")
        .bind(product_id)
        .bind(i64::from(quantity))
        .execute(conn)
        .await
        .with_context(|| format!("Problem decrementing stock of product {product_id}."))?;
    if result.rows_affected() == 0 {
        warn!("Product {product_id} no longer exists; stock not decremented");
    }
    Ok(())
}

//-------------------------- Tests -------------------------------
