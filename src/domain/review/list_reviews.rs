//! Reviews shown on a product page.

use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    domain::{ProductId, UserId},
    infra::{AuthUser, ClientError},
};

use super::{REVIEW_COLUMNS, Review, ReviewRow};

//------------------------- Web API ----------------------------

pub async fn reviews_endpoint(
    State(pool): State<PgPool>,
    Path(product_uuid): Path<Uuid>,
) -> Result<Json<Vec<ProductReview>>, ClientError> {
    let product_id: ProductId = product_uuid.try_into()?;
    Ok(Json(reviews(&pool, product_id).await?))
}

pub async fn my_review_endpoint(
    AuthUser(user): AuthUser,
    State(pool): State<PgPool>,
    Path(product_uuid): Path<Uuid>,
) -> Result<Json<Option<Review>>, ClientError> {
    let product_id: ProductId = product_uuid.try_into()?;
    Ok(Json(my_review(&pool, user.user_id, product_id).await?))
}

//----------------------- Implementation --------------------------

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductReview {
    #[serde(flatten)]
    pub review: Review,
    pub user_name: String,
}

#[derive(sqlx::FromRow)]
struct ProductReviewRow {
    #[sqlx(flatten)]
    review: ReviewRow,
    user_name: String,
}

/// Newest first.
pub async fn reviews(pool: &PgPool, product_id: ProductId) -> Result<Vec<ProductReview>, anyhow::Error> {
    let rows: Vec<ProductReviewRow> = sqlx::query_as(
        "SELECT r.review_id, r.product_id, r.user_id, r.rating, r.title, r.description,
                r.is_verified_purchase, r.created_at, u.name AS user_name
         FROM reviews r JOIN users u ON u.user_id = r.user_id
         WHERE r.product_id = $1
         ORDER BY r.created_at DESC, r.review_id DESC",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await
    .with_context(|| format!("Problem reading reviews of product {product_id}."))?;

    Ok(rows
        .into_iter()
        .map(|row| ProductReview {
            review: row.review.into(),
            user_name: row.user_name,
        })
        .collect())
}

pub async fn my_review(
    pool: &PgPool,
    user_id: UserId,
    product_id: ProductId,
) -> Result<Option<Review>, anyhow::Error> {
    let row: Option<ReviewRow> = sqlx::query_as(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews WHERE product_id = $1 AND user_id = $2"
    ))
    .bind(product_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("Problem reading review of product {product_id} by {user_id}."))?;
    Ok(row.map(Into::into))
}

//-------------------------- Tests -------------------------------
