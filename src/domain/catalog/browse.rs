//! Public catalog pages: home page lists, product details and categories.

use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
};
use sqlx::PgPool;

use crate::{
    domain::ProductId,
    infra::{ClientError, Settings},
};

use super::CatalogError;
use super::model::{PRODUCT_COLUMNS, Product, ProductRow};

//------------------------- Web API ----------------------------

pub async fn latest_products_endpoint(
    State(pool): State<PgPool>,
    State(settings): State<Settings>,
) -> Result<Json<Vec<Product>>, ClientError> {
    let products = latest_products(&pool, settings.application.latest_products_limit).await?;
    Ok(Json(products))
}

pub async fn featured_products_endpoint(
    State(pool): State<PgPool>,
) -> Result<Json<Vec<Product>>, ClientError> {
    Ok(Json(featured_products(&pool).await?))
}

pub async fn product_by_slug_endpoint(
    State(pool): State<PgPool>,
    Path(slug): Path<String>,
) -> Result<Json<Product>, ClientError> {
    let product = product_by_slug(&pool, &slug)
        .await?
        .ok_or(CatalogError::ProductNotFound)?;
    Ok(Json(product))
}

pub async fn categories_endpoint(
    State(pool): State<PgPool>,
) -> Result<Json<Vec<CategoryCount>>, ClientError> {
    Ok(Json(all_categories(&pool).await?))
}

//----------------------- Implementation --------------------------

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category: String,
    pub product_count: i64,
}

pub async fn latest_products(pool: &PgPool, limit: i64) -> Result<Vec<Product>, anyhow::Error> {
    let rows: Vec<ProductRow> = sqlx::query_as(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, product_id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Problem reading latest products.")?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn featured_products(pool: &PgPool) -> Result<Vec<Product>, anyhow::Error> {
    let rows: Vec<ProductRow> = sqlx::query_as(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products
         WHERE is_featured
         ORDER BY created_at DESC
         LIMIT 4"
    ))
    .fetch_all(pool)
    .await
    .context("Problem reading featured products.")?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn product_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Product>, anyhow::Error> {
    let row: Option<ProductRow> = sqlx::query_as(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("Problem reading product with slug {slug}."))?;
    Ok(row.map(Into::into))
}

pub async fn product_by_id(pool: &PgPool, product_id: ProductId) -> Result<Product, ClientError> {
    super::model::find_product(pool, product_id)
        .await?
        .ok_or_else(|| CatalogError::ProductNotFound.into())
}

pub async fn all_categories(pool: &PgPool) -> Result<Vec<CategoryCount>, anyhow::Error> {
    sqlx::query_as(
        "SELECT category, count(*) AS product_count
         FROM products
         GROUP BY category
         ORDER BY category",
    )
    .fetch_all(pool)
    .await
    .context("Problem reading product categories.")
}

//-------------------------- Tests -------------------------------
