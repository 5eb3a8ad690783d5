use std::borrow::Cow;

use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::PgExecutor;
use validator::{Validate, ValidationError};

use crate::domain::{ProductId, helpers::money::is_currency};

pub(crate) const PRODUCT_COLUMNS: &str = "product_id, name, slug, category, brand, description, \
     images, stock, price, rating, num_reviews, is_featured, banner, created_at";

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub category: String,
    pub brand: String,
    pub description: String,
    pub images: Vec<String>,
    pub stock: i32,
    pub price: Decimal,
    pub rating: Decimal,
    pub num_reviews: i32,
    pub is_featured: bool,
    pub banner: Option<String>,
    pub created_at: jiff::Timestamp,
}

impl Product {
    pub fn from_input(product_id: ProductId, input: ProductInput) -> Self {
        Product {
            product_id,
            name: input.name,
            slug: input.slug,
            category: input.category,
            brand: input.brand,
            description: input.description,
            images: input.images,
            stock: input.stock,
            price: input.price,
            rating: Decimal::ZERO,
            num_reviews: 0,
            is_featured: input.is_featured,
            banner: input.banner,
            created_at: jiff::Timestamp::now(),
        }
    }

    /// The image shown in carts and orders.
    pub fn thumbnail(&self) -> &str {
        self.images.first().map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    product_id: ProductId,
    name: String,
    slug: String,
    category: String,
    brand: String,
    description: String,
    images: Vec<String>,
    stock: i32,
    price: Decimal,
    rating: Decimal,
    num_reviews: i32,
    is_featured: bool,
    banner: Option<String>,
    created_at: jiff_sqlx::Timestamp,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            product_id: row.product_id,
            name: row.name,
            slug: row.slug,
            category: row.category,
            brand: row.brand,
            description: row.description,
            images: row.images,
            stock: row.stock,
            price: row.price,
            rating: row.rating,
            num_reviews: row.num_reviews,
            is_featured: row.is_featured,
            banner: row.banner,
            created_at: row.created_at.to_jiff(),
        }
    }
}

/// Fields an admin supplies when creating or updating a product.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    #[validate(length(min = 3, message = "Name must be at least 3 characters."))]
    pub name: String,
    #[validate(length(min = 3, message = "Slug must be at least 3 characters."))]
    pub slug: String,
    #[validate(length(min = 3, message = "Category must be at least 3 characters."))]
    pub category: String,
    #[validate(length(min = 1, message = "Brand cannot be empty."))]
    pub brand: String,
    #[validate(length(min = 3, message = "Description must be at least 3 characters."))]
    pub description: String,
    #[validate(range(min = 0, message = "Stock cannot be negative."))]
    pub stock: i32,
    #[validate(length(min = 1, message = "Product must have at least one image."))]
    pub images: Vec<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub banner: Option<String>,
    #[validate(custom(function = "validate_price"))]
    pub price: Decimal,
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if is_currency(price) {
        return Ok(());
    }
    let mut error = ValidationError::new("currency");
    error.message = Some(Cow::Borrowed("Price must have exactly two decimal places"));
    Err(error)
}

pub async fn find_product<'e>(
    executor: impl PgExecutor<'e>,
    product_id: ProductId,
) -> Result<Option<Product>, anyhow::Error> {
    let row: Option<ProductRow> = sqlx::query_as(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = $1"
    ))
    .bind(product_id)
    .fetch_optional(executor)
    .await
    .with_context(|| format!("Problem reading product {product_id}."))?;
    Ok(row.map(Into::into))
}
