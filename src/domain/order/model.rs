//! Orders are snapshots of a cart at checkout. Lines, prices and the shipping address never
//! change after creation; only the paid and delivered flags move, each exactly once.

use anyhow::Context;
use jiff_sqlx::ToSqlx;
use rust_decimal::Decimal;
use sqlx::{PgConnection, types::Json};

use crate::domain::{
    OrderId, ProductId, UserId,
    cart::CartItem,
    pricing::{PricedLine, Prices},
    user::{PaymentMethod, ShippingAddress},
};
use crate::infra::SessionUser;

use super::OrderError;

/// What a payment provider reported for the order.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub id: String,
    pub status: String,
    pub email_address: String,
    pub price_paid: Decimal,
}

impl PaymentResult {
    /// Placeholder stored when a provider order is created, before anything is paid.
    pub fn pending(id: impl Into<String>) -> Self {
        PaymentResult {
            id: id.into(),
            status: String::new(),
            email_address: String::new(),
            price_paid: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub image: String,
    pub price: Decimal,
    pub quantity: u32,
}

impl From<&CartItem> for OrderItem {
    fn from(item: &CartItem) -> Self {
        OrderItem {
            product_id: item.product_id,
            name: item.name.clone(),
            slug: item.slug.clone(),
            image: item.image.clone(),
            price: item.price,
            quantity: item.quantity,
        }
    }
}

impl PricedLine for OrderItem {
    fn unit_price(&self) -> Decimal {
        self.price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_result: Option<PaymentResult>,
    #[serde(flatten)]
    pub prices: Prices,
    pub is_paid: bool,
    pub paid_at: Option<jiff::Timestamp>,
    pub is_delivered: bool,
    pub delivered_at: Option<jiff::Timestamp>,
    pub created_at: jiff::Timestamp,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// The buyer and admins.
    pub fn is_visible_to(&self, viewer: &SessionUser) -> bool {
        viewer.is_admin() || self.user_id == viewer.user_id
    }

    pub fn ensure_payable(&self) -> Result<(), OrderError> {
        if self.is_paid {
            return Err(OrderError::AlreadyPaid);
        }
        Ok(())
    }

    pub fn ensure_deliverable(&self) -> Result<(), OrderError> {
        if !self.is_paid {
            return Err(OrderError::NotPaid);
        }
        Ok(())
    }

    /// Without a provider payload the stored payment result is kept as it is.
    pub fn mark_paid(
        &mut self,
        payment_result: Option<PaymentResult>,
        paid_at: jiff::Timestamp,
    ) -> Result<(), OrderError> {
        self.ensure_payable()?;
        self.is_paid = true;
        self.paid_at = Some(paid_at);
        if payment_result.is_some() {
            self.payment_result = payment_result;
        }
        Ok(())
    }

    pub fn mark_delivered(&mut self, delivered_at: jiff::Timestamp) -> Result<(), OrderError> {
        self.ensure_deliverable()?;
        self.is_delivered = true;
        self.delivered_at = Some(delivered_at);
        Ok(())
    }
}

//-------------------------- SQL -------------------------------

pub(crate) const ORDER_COLUMNS: &str = "order_id, user_id, shipping_address, payment_method, \
     payment_result, items_price, shipping_price, tax_price, total_price, is_paid, paid_at, \
     is_delivered, delivered_at, created_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct OrderRow {
    order_id: OrderId,
    user_id: UserId,
    shipping_address: Json<ShippingAddress>,
    payment_method: PaymentMethod,
    payment_result: Option<Json<PaymentResult>>,
    items_price: Decimal,
    shipping_price: Decimal,
    tax_price: Decimal,
    total_price: Decimal,
    is_paid: bool,
    paid_at: Option<jiff_sqlx::Timestamp>,
    is_delivered: bool,
    delivered_at: Option<jiff_sqlx::Timestamp>,
    created_at: jiff_sqlx::Timestamp,
}

impl OrderRow {
    pub(crate) fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            order_id: self.order_id,
            user_id: self.user_id,
            shipping_address: self.shipping_address.0,
            payment_method: self.payment_method,
            payment_result: self.payment_result.map(|result| result.0),
            prices: Prices {
                items_price: self.items_price,
                shipping_price: self.shipping_price,
                tax_price: self.tax_price,
                total_price: self.total_price,
            },
            is_paid: self.is_paid,
            paid_at: self.paid_at.map(|at| at.to_jiff()),
            is_delivered: self.is_delivered,
            delivered_at: self.delivered_at.map(|at| at.to_jiff()),
            created_at: self.created_at.to_jiff(),
            items,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    product_id: ProductId,
    name: String,
    slug: String,
    image: String,
    price: Decimal,
    quantity: i32,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = anyhow::Error;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(OrderItem {
            product_id: row.product_id,
            name: row.name,
            slug: row.slug,
            image: row.image,
            price: row.price,
            quantity: u32::try_from(row.quantity)
                .with_context(|| format!("Invalid quantity {} for {}.", row.quantity, row.product_id))?,
        })
    }
}

/// Loads the order with its lines. With `lock` the order row stays locked until the
/// transaction ends.
pub async fn find_order(
    conn: &mut PgConnection,
    order_id: OrderId,
    lock: bool,
) -> Result<Option<Order>, anyhow::Error> {
    let lock_clause = if lock { " FOR UPDATE" } else { "" };
    let row: Option<OrderRow> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1{lock_clause}"
    ))
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await
    .with_context(|| format!("Problem reading order {order_id}."))?;

    let Some(row) = row else {
        return Ok(None);
    };
    let items = order_items(conn, order_id).await?;
    Ok(Some(row.into_order(items)))
}

async fn order_items(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<Vec<OrderItem>, anyhow::Error> {
    let rows: Vec<OrderItemRow> = sqlx::query_as(
        "SELECT product_id, name, slug, image, price, quantity
         FROM order_items WHERE order_id = $1 ORDER BY position",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await
    .with_context(|| format!("Problem reading items of order {order_id}."))?;
    rows.into_iter().map(TryInto::try_into).collect()
}

pub async fn insert_order(conn: &mut PgConnection, order: &Order) -> Result<(), anyhow::Error> {
    sqlx::query(
        "INSERT INTO orders (order_id, user_id, shipping_address, payment_method, payment_result,
             items_price, shipping_price, tax_price, total_price, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(order.order_id)
    .bind(order.user_id)
    .bind(Json(&order.shipping_address))
    .bind(order.payment_method)
    .bind(order.payment_result.as_ref().map(Json))
    .bind(order.prices.items_price)
    .bind(order.prices.shipping_price)
    .bind(order.prices.tax_price)
    .bind(order.prices.total_price)
    .bind(order.created_at.to_sqlx())
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Problem inserting order {}.", order.order_id))?;

    for (position, item) in order.items.iter().enumerate() {
        let position = i32::try_from(position).context("Too many order lines.")?;
        let quantity = i32::try_from(item.quantity)
            .with_context(|| format!("Quantity of {} is too large.", item.product_id))?;
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, position, name, slug, image, price, quantity)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(order.order_id)
        .bind(item.product_id)
        .bind(position)
        .bind(&item.name)
        .bind(&item.slug)
        .bind(&item.image)
        .bind(item.price)
        .bind(quantity)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Problem inserting line {} of order {}.", position, order.order_id))?;
    }
    Ok(())
}

/// Writes the mutable part of an order: payment result and the paid and delivered flags.
pub async fn save_order_status(conn: &mut PgConnection, order: &Order) -> Result<(), anyhow::Error> {
    sqlx::query(
        "UPDATE orders
         SET payment_result = $2, is_paid = $3, paid_at = $4, is_delivered = $5, delivered_at = $6
         WHERE order_id = $1",
    )
    .bind(order.order_id)
    .bind(order.payment_result.as_ref().map(Json))
    .bind(order.is_paid)
    .bind(order.paid_at.map(|at| at.to_sqlx()))
    .bind(order.is_delivered)
    .bind(order.delivered_at.map(|at| at.to_sqlx()))
    .execute(conn)
    .await
    .with_context(|| format!("Problem updating status of order {}.", order.order_id))?;
    Ok(())
}

//-------------------------- Tests -------------------------------
