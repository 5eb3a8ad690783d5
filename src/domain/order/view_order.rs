//! Order queries for buyers: a single order with its buyer, and the caller's order history.

use anyhow::Context;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    domain::{
        OrderId, UserId,
        helpers::pagination::{PageQuery, Paginated, offset, total_pages},
    },
    infra::{AuthUser, ClientError, SessionUser, Settings},
};

use super::{Order, OrderError, find_order};

//------------------------- Web API ----------------------------

pub async fn order_endpoint(
    AuthUser(user): AuthUser,
    State(pool): State<PgPool>,
    Path(order_uuid): Path<Uuid>,
) -> Result<Json<OrderDetails>, ClientError> {
    let order_id: OrderId = order_uuid.try_into()?;
    Ok(Json(order_by_id(&pool, &user, order_id).await?))
}

pub async fn my_orders_endpoint(
    AuthUser(user): AuthUser,
    State(pool): State<PgPool>,
    State(settings): State<Settings>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<OrderOverview>>, ClientError> {
    let orders = my_orders(
        &pool,
        user.user_id,
        query.page(),
        settings.application.pagination_size,
    )
    .await?;
    Ok(Json(orders))
}

//----------------------- Implementation --------------------------

#[derive(Debug, Clone, PartialEq, serde::Serialize, sqlx::FromRow)]
pub struct Buyer {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub user: Buyer,
}

/// An order without its lines, as shown in listings.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderOverview {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub buyer_name: String,
    pub total_price: Decimal,
    pub is_paid: bool,
    pub paid_at: Option<jiff::Timestamp>,
    pub is_delivered: bool,
    pub delivered_at: Option<jiff::Timestamp>,
    pub created_at: jiff::Timestamp,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct OrderOverviewRow {
    order_id: OrderId,
    user_id: UserId,
    buyer_name: String,
    total_price: Decimal,
    is_paid: bool,
    paid_at: Option<jiff_sqlx::Timestamp>,
    is_delivered: bool,
    delivered_at: Option<jiff_sqlx::Timestamp>,
    created_at: jiff_sqlx::Timestamp,
}

impl From<OrderOverviewRow> for OrderOverview {
    fn from(row: OrderOverviewRow) -> Self {
        OrderOverview {
            order_id: row.order_id,
            user_id: row.user_id,
            buyer_name: row.buyer_name,
            total_price: row.total_price,
            is_paid: row.is_paid,
            paid_at: row.paid_at.map(|at| at.to_jiff()),
            is_delivered: row.is_delivered,
            delivered_at: row.delivered_at.map(|at| at.to_jiff()),
            created_at: row.created_at.to_jiff(),
        }
    }
}

pub(crate) const OVERVIEW_SELECT: &str = "SELECT o.order_id, o.user_id, u.name AS buyer_name, \
     o.total_price, o.is_paid, o.paid_at, o.is_delivered, o.delivered_at, o.created_at \
     FROM orders o JOIN users u ON u.user_id = o.user_id";

pub async fn order_details(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<Option<OrderDetails>, anyhow::Error> {
    let Some(order) = find_order(&mut *conn, order_id, false).await? else {
        return Ok(None);
    };
    let user: Buyer = sqlx::query_as("SELECT name, email FROM users WHERE user_id = $1")
        .bind(order.user_id)
        .fetch_one(conn)
        .await
        .with_context(|| format!("Problem reading buyer of order {order_id}."))?;
    Ok(Some(OrderDetails { order, user }))
}

/// Only the buyer and admins may see an order. Anyone else gets the same answer as for a
/// missing order.
pub async fn order_by_id(
    pool: &PgPool,
    viewer: &SessionUser,
    order_id: OrderId,
) -> Result<OrderDetails, ClientError> {
    let mut conn = pool.acquire().await.context("Problem acquiring connection.")?;
    let details = order_details(&mut conn, order_id)
        .await?
        .filter(|details| details.order.is_visible_to(viewer))
        .ok_or(OrderError::OrderNotFound)?;
    Ok(details)
}

/// An unpaid order the viewer may start paying for. Other buyers' orders read as missing.
pub async fn payable_order(
    pool: &PgPool,
    viewer: &SessionUser,
    order_id: OrderId,
) -> Result<Order, ClientError> {
    let mut conn = pool.acquire().await.context("Problem acquiring connection.")?;
    let order = find_order(&mut conn, order_id, false)
        .await?
        .filter(|order| order.is_visible_to(viewer))
        .ok_or(OrderError::OrderNotFound)?;
    order.ensure_payable()?;
    Ok(order)
}

/// Newest first.
pub async fn my_orders(
    pool: &PgPool,
    user_id: UserId,
    page: i64,
    page_size: i64,
) -> Result<Paginated<OrderOverview>, anyhow::Error> {
    let row_count: i64 = sqlx::query_scalar("SELECT count(*) FROM orders WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .with_context(|| format!("Problem counting orders of user {user_id}."))?;

    let rows: Vec<OrderOverviewRow> = sqlx::query_as(&format!(
        "{OVERVIEW_SELECT} WHERE o.user_id = $1
         ORDER BY o.created_at DESC, o.order_id DESC LIMIT $2 OFFSET $3"
    ))
    .bind(user_id)
    .bind(page_size)
    .bind(offset(page, page_size))
    .fetch_all(pool)
    .await
    .with_context(|| format!("Problem reading orders of user {user_id}."))?;

    Ok(Paginated {
        data: rows.into_iter().map(Into::into).collect(),
        total_pages: total_pages(row_count, page_size),
    })
}

//-------------------------- Tests -------------------------------
