//! Back-office order management.

use anyhow::Context;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::{
    domain::{
        OrderId,
        helpers::pagination::{PageQuery, Paginated, offset, total_pages},
    },
    infra::{ActionResult, AdminUser, ClientError, Settings},
};

use super::{
    Order, OrderError, find_order, save_order_status,
    view_order::{OVERVIEW_SELECT, OrderOverview, OrderOverviewRow},
};

//------------------------- Web API ----------------------------

pub async fn admin_orders_endpoint(
    _admin: AdminUser,
    State(pool): State<PgPool>,
    State(settings): State<Settings>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<OrderOverview>>, ClientError> {
    let orders = all_orders(&pool, query.page(), settings.application.pagination_size).await?;
    Ok(Json(orders))
}

pub async fn delete_order_endpoint(
    AdminUser(admin): AdminUser,
    State(pool): State<PgPool>,
    Path(order_uuid): Path<Uuid>,
) -> Result<ActionResult, ClientError> {
    let order_id: OrderId = order_uuid.try_into()?;
    delete_order(&pool, order_id).await?;
    info!("Order {order_id} deleted by {}", admin.user_id);
    Ok(ActionResult::ok("Order successfully deleted."))
}

pub async fn deliver_order_endpoint(
    AdminUser(admin): AdminUser,
    State(pool): State<PgPool>,
    Path(order_uuid): Path<Uuid>,
) -> Result<ActionResult, ClientError> {
    let order_id: OrderId = order_uuid.try_into()?;
    deliver_order(&pool, order_id).await?;
    info!("Order {order_id} marked as delivered by {}", admin.user_id);
    Ok(ActionResult::ok("Order marked as delivered."))
}

//----------------------- Implementation --------------------------

/// Newest first, with the buyer's name.
pub async fn all_orders(
    pool: &PgPool,
    page: i64,
    page_size: i64,
) -> Result<Paginated<OrderOverview>, anyhow::Error> {
    let row_count: i64 = sqlx::query_scalar("SELECT count(*) FROM orders")
        .fetch_one(pool)
        .await
        .context("Problem counting orders.")?;

    let rows: Vec<OrderOverviewRow> = sqlx::query_as(&format!(
        "{OVERVIEW_SELECT} ORDER BY o.created_at DESC, o.order_id DESC LIMIT $1 OFFSET $2"
    ))
    .bind(page_size)
    .bind(offset(page, page_size))
    .fetch_all(pool)
    .await
    .context("Problem reading orders page.")?;

    Ok(Paginated {
        data: rows.into_iter().map(Into::into).collect(),
        total_pages: total_pages(row_count, page_size),
    })
}

pub async fn delete_order(pool: &PgPool, order_id: OrderId) -> Result<(), ClientError> {
    let result = sqlx::query("DELETE FROM orders WHERE order_id = $1")
        .bind(order_id)
        .execute(pool)
        .await
        .with_context(|| format!("Problem deleting order {order_id}."))?;
    if result.rows_affected() == 0 {
        return Err(OrderError::OrderNotFound.into());
    }
    Ok(())
}

/// Only paid orders can be delivered.
pub async fn deliver_order(pool: &PgPool, order_id: OrderId) -> Result<Order, ClientError> {
    let mut tx = pool.begin().await.context("Problem starting delivery transaction.")?;

    let mut order = find_order(&mut tx, order_id, true)
        .await?
        .ok_or(OrderError::OrderNotFound)?;
    order.mark_delivered(jiff::Timestamp::now())?;
    save_order_status(&mut tx, &order).await?;

    tx.commit().await.context("Problem committing delivery.")?;
    Ok(order)
}

//-------------------------- Tests -------------------------------
