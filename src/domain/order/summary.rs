//! Admin dashboard figures.

use anyhow::Context;
use axum::{Json, extract::State};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{
    domain::helpers::money::round2,
    infra::{AdminUser, ClientError},
};

use super::view_order::{OVERVIEW_SELECT, OrderOverview, OrderOverviewRow};

const LATEST_SALES: i64 = 6;

//------------------------- Web API ----------------------------

pub async fn orders_summary_endpoint(
    _admin: AdminUser,
    State(pool): State<PgPool>,
) -> Result<Json<OrdersSummary>, ClientError> {
    Ok(Json(orders_summary(&pool).await?))
}

//----------------------- Implementation --------------------------

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersSummary {
    pub orders_count: i64,
    pub products_count: i64,
    pub users_count: i64,
    pub total_sales: Decimal,
    pub sales_data: Vec<MonthlySales>,
    pub latest_sales: Vec<OrderOverview>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySales {
    /// `MM/YY`
    pub month: String,
    pub total_sales: Decimal,
}

#[derive(sqlx::FromRow)]
struct Counts {
    orders_count: i64,
    products_count: i64,
    users_count: i64,
    total_sales: Option<Decimal>,
}

pub async fn orders_summary(pool: &PgPool) -> Result<OrdersSummary, anyhow::Error> {
    let counts: Counts = sqlx::query_as(
        "SELECT
             (SELECT count(*) FROM orders) AS orders_count,
             (SELECT count(*) FROM products) AS products_count,
             (SELECT count(*) FROM users) AS users_count,
             (SELECT sum(total_price) FROM orders WHERE is_paid) AS total_sales",
    )
    .fetch_one(pool)
    .await
    .context("Problem counting dashboard figures.")?;

    // Chronological across year boundaries.
    let sales_data: Vec<MonthlySales> = sqlx::query_as(
        "SELECT to_char(date_trunc('month', created_at), 'MM/YY') AS month,
                sum(total_price) AS total_sales
         FROM orders
         WHERE is_paid
         GROUP BY date_trunc('month', created_at)
         ORDER BY date_trunc('month', created_at)",
    )
    .fetch_all(pool)
    .await
    .context("Problem reading monthly sales.")?;

    let latest: Vec<OrderOverviewRow> = sqlx::query_as(&format!(
        "{OVERVIEW_SELECT} ORDER BY o.created_at DESC, o.order_id DESC LIMIT $1"
    ))
    .bind(LATEST_SALES)
    .fetch_all(pool)
    .await
    .context("Problem reading latest sales.")?;

    Ok(OrdersSummary {
        orders_count: counts.orders_count,
        products_count: counts.products_count,
        users_count: counts.users_count,
        total_sales: round2(counts.total_sales.unwrap_or_default()),
        sales_data,
        latest_sales: latest.into_iter().map(Into::into).collect(),
    })
}

//-------------------------- Tests -------------------------------

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::order::{confirm_payment, confirm_payment::tests::placed_order};

    #[sqlx::test]
    async fn only_paid_orders_count_as_sales(pool: PgPool) {
        let (_, _, paid) = placed_order(&pool, 1, 5).await;
        placed_order(&pool, 2, 5).await;
        confirm_payment(&pool, paid, None)
            .await
            .expect("Payment should be confirmed.");

        let summary = orders_summary(&pool).await.expect("Summary should load.");

        assert_eq!(summary.orders_count, 2);
        assert_eq!(summary.products_count, 2);
        assert_eq!(summary.users_count, 2);
        // One unit at 20.00: shipping 10.00 and tax 3.00.
        assert_eq!(summary.total_sales, dec!(33.00));
        assert_eq!(summary.sales_data.len(), 1);
        assert_eq!(summary.sales_data[0].total_sales, dec!(33.00));
        let month = &summary.sales_data[0].month;
        assert_eq!(month.len(), 5);
        assert_eq!(month.chars().nth(2), Some('/'));
        assert_eq!(summary.latest_sales.len(), 2);
    }

    #[sqlx::test]
    async fn an_empty_store_has_zero_sales(pool: PgPool) {
        let summary = orders_summary(&pool).await.expect("Summary should load.");

        assert_eq!(summary.total_sales, dec!(0.00));
        assert!(summary.sales_data.is_empty());
        assert!(summary.latest_sales.is_empty());
    }
}
