//! Back-office product management.

use anyhow::Context;
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::{
        ProductId,
        helpers::pagination::{PageQuery, Paginated, offset, total_pages},
    },
    infra::{ActionResult, AdminUser, ClientError, Settings},
    providers::ImageStore,
};

use super::CatalogError;
use super::model::{PRODUCT_COLUMNS, Product, ProductInput, ProductRow, find_product};

//------------------------- Web API ----------------------------

pub async fn admin_products_endpoint(
    _admin: AdminUser,
    State(pool): State<PgPool>,
    State(settings): State<Settings>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<Product>>, ClientError> {
    let products = list_products(
        &pool,
        query.query(),
        query.page(),
        settings.application.pagination_size,
    )
    .await?;
    Ok(Json(products))
}

pub async fn admin_product_endpoint(
    _admin: AdminUser,
    State(pool): State<PgPool>,
    Path(product_uuid): Path<Uuid>,
) -> Result<Json<Product>, ClientError> {
    let product_id: ProductId = product_uuid.try_into()?;
    Ok(Json(super::browse::product_by_id(&pool, product_id).await?))
}

pub async fn create_product_endpoint(
    AdminUser(admin): AdminUser,
    State(pool): State<PgPool>,
    Json(input): Json<ProductInput>,
) -> Result<ActionResult<Product>, ClientError> {
    input.validate()?;
    let product = create_product(&pool, input).await?;
    info!("Product {} created by {}", product.product_id, admin.user_id);
    Ok(ActionResult::with_data("Product created successfully", product))
}

pub async fn update_product_endpoint(
    _admin: AdminUser,
    State(pool): State<PgPool>,
    Path(product_uuid): Path<Uuid>,
    Json(input): Json<ProductInput>,
) -> Result<ActionResult<Product>, ClientError> {
    let product_id: ProductId = product_uuid.try_into()?;
    input.validate()?;
    let product = update_product(&pool, product_id, input).await?;
    Ok(ActionResult::with_data("Product updated successfully", product))
}

pub async fn delete_product_endpoint(
    _admin: AdminUser,
    State(pool): State<PgPool>,
    State(images): State<ImageStore>,
    Path(product_uuid): Path<Uuid>,
) -> Result<ActionResult, ClientError> {
    let product_id: ProductId = product_uuid.try_into()?;
    delete_product(&pool, &images, product_id).await?;
    Ok(ActionResult::ok("Product deleted successfully"))
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadQuery {
    pub file_name: String,
}

/// The body is the raw file content.
pub async fn upload_image_endpoint(
    _admin: AdminUser,
    State(images): State<ImageStore>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<ActionResult<String>, ClientError> {
    if body.is_empty() {
        return Err(ClientError::Validation("Please select a file.".to_owned()));
    }
    let url = images
        .upload(&query.file_name, &body)
        .await
        .context("Failed to upload image.")?;
    Ok(ActionResult::with_data("Image uploaded successfully", url))
}

//----------------------- Implementation --------------------------

pub async fn list_products(
    pool: &PgPool,
    name_query: Option<&str>,
    page: i64,
    page_size: i64,
) -> Result<Paginated<Product>, anyhow::Error> {
    fn push_filter<'a>(builder: &mut QueryBuilder<'a, Postgres>, name_query: Option<&'a str>) {
        if let Some(name) = name_query {
            builder
                .push(" WHERE name ILIKE ")
                .push_bind(format!("%{name}%"));
        }
    }

    let mut count_query = QueryBuilder::new("SELECT count(*) FROM products");
    push_filter(&mut count_query, name_query);
    let row_count: i64 = count_query
        .build_query_scalar()
        .fetch_one(pool)
        .await
        .context("Problem counting products.")?;

    let mut page_query = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
    push_filter(&mut page_query, name_query);
    page_query
        .push(" ORDER BY created_at DESC, product_id DESC LIMIT ")
        .push_bind(page_size)
        .push(" OFFSET ")
        .push_bind(offset(page, page_size));
    let rows: Vec<ProductRow> = page_query
        .build_query_as()
        .fetch_all(pool)
        .await
        .context("Problem listing products.")?;

    Ok(Paginated {
        data: rows.into_iter().map(Into::into).collect(),
        total_pages: total_pages(row_count, page_size),
    })
}

pub async fn create_product(pool: &PgPool, input: ProductInput) -> Result<Product, anyhow::Error> {
    let product_id = ProductId::new();
    let row: ProductRow = sqlx::query_as(&format!(
        "INSERT INTO products
            (product_id, name, slug, category, brand, description, images, stock, price,
             is_featured, banner)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(product_id)
    .bind(&input.name)
    .bind(&input.slug)
    .bind(&input.category)
    .bind(&input.brand)
    .bind(&input.description)
    .bind(&input.images)
    .bind(input.stock)
    .bind(input.price)
    .bind(input.is_featured)
    .bind(&input.banner)
    .fetch_one(pool)
    .await
    .with_context(|| format!("Problem creating product {}.", input.slug))?;
    Ok(row.into())
}

pub async fn update_product(
    pool: &PgPool,
    product_id: ProductId,
    input: ProductInput,
) -> Result<Product, ClientError> {
    let row: Option<ProductRow> = sqlx::query_as(&format!(
        "UPDATE products
         SET name = $2, slug = $3, category = $4, brand = $5, description = $6, images = $7,
             stock = $8, price = $9, is_featured = $10, banner = $11
         WHERE product_id = $1
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(product_id)
    .bind(&input.name)
    .bind(&input.slug)
    .bind(&input.category)
    .bind(&input.brand)
    .bind(&input.description)
    .bind(&input.images)
    .bind(input.stock)
    .bind(input.price)
    .bind(input.is_featured)
    .bind(&input.banner)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("Problem updating product {product_id}."))?;
    row.map(Into::into)
        .ok_or_else(|| CatalogError::ProductNotFound.into())
}

/// Removes the product and then, best-effort, its images.
pub async fn delete_product(
    pool: &PgPool,
    images: &ImageStore,
    product_id: ProductId,
) -> Result<(), ClientError> {
    let product = find_product(pool, product_id)
        .await?
        .ok_or(CatalogError::ProductNotFound)?;

    sqlx::query("DELETE FROM products WHERE product_id = $1")
        .bind(product_id)
        .execute(pool)
        .await
        .with_context(|| format!("Problem deleting product {product_id}."))?;

    for url in product.images.iter().chain(product.banner.iter()) {
        images.delete(url).await;
    }
    info!("Product {product_id} deleted");
    Ok(())
}

//-------------------------- Tests -------------------------------
