use rust_decimal::Decimal;

use crate::domain::{ProductId, ReviewId, UserId, helpers::money::round2};

pub(crate) const REVIEW_COLUMNS: &str = "review_id, product_id, user_id, rating, title, \
     description, is_verified_purchase, created_at";

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub review_id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: i32,
    pub title: String,
    pub description: String,
    pub is_verified_purchase: bool,
    pub created_at: jiff::Timestamp,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ReviewRow {
    review_id: ReviewId,
    product_id: ProductId,
    user_id: UserId,
    rating: i32,
    title: String,
    description: String,
    is_verified_purchase: bool,
    created_at: jiff_sqlx::Timestamp,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            review_id: row.review_id,
            product_id: row.product_id,
            user_id: row.user_id,
            rating: row.rating,
            title: row.title,
            description: row.description,
            is_verified_purchase: row.is_verified_purchase,
            created_at: row.created_at.to_jiff(),
        }
    }
}

/// The `rating` and `num_reviews` a product carries, derived from all of its reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingSummary {
    pub rating: Decimal,
    pub num_reviews: i32,
}

impl RatingSummary {
    pub fn from_ratings(ratings: &[i32]) -> Self {
        if ratings.is_empty() {
            return RatingSummary {
                rating: round2(Decimal::ZERO),
                num_reviews: 0,
            };
        }
        let total: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
        let count = ratings.len() as i64;
        RatingSummary {
            rating: round2(Decimal::from(total) / Decimal::from(count)),
            num_reviews: ratings.len() as i32,
        }
    }
}
