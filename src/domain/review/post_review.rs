//! Post Review slice

use anyhow::Context;
use axum::{Json, extract::State};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::{ProductId, ReviewId, UserId},
    infra::{ActionResult, AuthUser, ClientError},
};

use super::{REVIEW_COLUMNS, RatingSummary, Review, ReviewError, ReviewRow};

//------------------------- Web API ----------------------------

#[derive(Debug, Clone, serde::Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPayload {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(min = 3, message = "Title must be at least 3 characters"))]
    pub title: String,
    #[validate(length(min = 3, message = "Description must be at least 3 characters"))]
    pub description: String,
}

pub async fn post_review_endpoint(
    AuthUser(user): AuthUser,
    State(pool): State<PgPool>,
    Json(payload): Json<ReviewPayload>,
) -> Result<ActionResult<Review>, ClientError> {
    let review = post_review(&pool, user.user_id, &payload).await?;
    info!(
        "Review {} of product {} posted by {}",
        review.review_id, review.product_id, user.user_id
    );
    Ok(ActionResult::with_data("Your review is posted.", review))
}

//----------------------- Implementation --------------------------

/// One review per product and user: posting again replaces the earlier review. The product's
/// rating and review count are recomputed from every review in the same transaction.
pub async fn post_review(
    pool: &PgPool,
    user_id: UserId,
    payload: &ReviewPayload,
) -> Result<Review, ClientError> {
    payload.validate()?;
    let product_id: ProductId = payload.product_id.try_into()?;

    let mut tx = pool.begin().await.context("Problem starting review transaction.")?;

    // Serializes concurrent reviews of the same product.
    let product: Option<ProductId> =
        sqlx::query_scalar("SELECT product_id FROM products WHERE product_id = $1 FOR UPDATE")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await
            .with_context(|| format!("Problem locking product {product_id}."))?;
    if product.is_none() {
        return Err(ReviewError::ProductNotFound.into());
    }

    let row: ReviewRow = sqlx::query_as(&format!(
        "INSERT INTO reviews (review_id, product_id, user_id, rating, title, description)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT ON CONSTRAINT reviews_product_user_key DO UPDATE
         SET rating = EXCLUDED.rating,
             title = EXCLUDED.title,
             description = EXCLUDED.description
         RETURNING {REVIEW_COLUMNS}"
    ))
    .bind(ReviewId::new())
    .bind(product_id)
    .bind(user_id)
    .bind(payload.rating)
    .bind(&payload.title)
    .bind(&payload.description)
    .fetch_one(&mut *tx)
    .await
    .with_context(|| format!("Problem saving review of product {product_id}."))?;

    let ratings: Vec<i32> = sqlx::query_scalar("SELECT rating FROM reviews WHERE product_id = $1")
        .bind(product_id)
        .fetch_all(&mut *tx)
        .await
        .with_context(|| format!("Problem reading ratings of product {product_id}."))?;
    let summary = RatingSummary::from_ratings(&ratings);

    sqlx::query("UPDATE products SET rating = $2, num_reviews = $3 WHERE product_id = $1")
        .bind(product_id)
        .bind(summary.rating)
        .bind(summary.num_reviews)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Problem updating rating of product {product_id}."))?;

    tx.commit().await.context("Problem committing review.")?;
    Ok(row.into())
}

//-------------------------- Tests -------------------------------

#[cfg(test)]
mod tests {
    use fake::Fake;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::{
        catalog::{Product, create_product, find_product},
        fake::InStock,
        user::{Role, insert_user},
    };

    async fn reviewer(pool: &PgPool) -> UserId {
        insert_user(pool, "Reviewer", &format!("{}@example.com", UserId::new()), "hash", Role::User)
            .await
            .expect("User should be created.")
    }

    fn payload(product: &Product, rating: i32, title: &str) -> ReviewPayload {
        ReviewPayload {
            product_id: Uuid::from(product.product_id),
            rating,
            title: title.to_owned(),
            description: "Fits well and washes nicely.".to_owned(),
        }
    }

    #[sqlx::test]
    async fn a_second_review_by_the_same_user_replaces_the_first(pool: PgPool) {
        let product = create_product(&pool, InStock(5).fake())
            .await
            .expect("Product should be created.");
        let user_id = reviewer(&pool).await;

        let first = post_review(&pool, user_id, &payload(&product, 2, "Too small"))
            .await
            .expect("Review should be posted.");
        let second = post_review(&pool, user_id, &payload(&product, 5, "Great after all"))
            .await
            .expect("Review should be updated.");

        assert_eq!(first.review_id, second.review_id);
        assert_eq!(second.rating, 5);
        assert_eq!(second.title, "Great after all");

        let product = find_product(&pool, product.product_id)
            .await
            .expect("Query should succeed.")
            .expect("Product should exist.");
        assert_eq!(product.num_reviews, 1);
        assert_eq!(product.rating, dec!(5.00));
    }

    #[sqlx::test]
    async fn product_rating_is_the_mean_of_all_reviews(pool: PgPool) {
        let product = create_product(&pool, InStock(5).fake())
            .await
            .expect("Product should be created.");
        for rating in [5, 4, 4] {
            let user_id = reviewer(&pool).await;
            post_review(&pool, user_id, &payload(&product, rating, "Solid shirt"))
                .await
                .expect("Review should be posted.");
        }

        let product = find_product(&pool, product.product_id)
            .await
            .expect("Query should succeed.")
            .expect("Product should exist.");
        assert_eq!(product.num_reviews, 3);
        assert_eq!(product.rating, dec!(4.33));
    }

    #[sqlx::test]
    async fn reviews_of_unknown_products_are_rejected(pool: PgPool) {
        let user_id = reviewer(&pool).await;
        let payload = ReviewPayload {
            product_id: Uuid::from(ProductId::new()),
            rating: 4,
            title: "Nice".to_owned(),
            description: "Nice shirt".to_owned(),
        };

        let result = post_review(&pool, user_id, &payload).await;
        assert!(matches!(
            result,
            Err(ClientError::Review(ReviewError::ProductNotFound))
        ));
    }

    #[sqlx::test]
    async fn ratings_outside_one_to_five_are_rejected(pool: PgPool) {
        let product = create_product(&pool, InStock(5).fake())
            .await
            .expect("Product should be created.");
        let user_id = reviewer(&pool).await;

        let result = post_review(&pool, user_id, &payload(&product, 6, "Best ever")).await;
        assert!(matches!(result, Err(ClientError::Validation(message)) if message == "Rating must be between 1 and 5"));
    }
}
