mod errors;
mod list_reviews;
mod model;
mod post_review;

pub use errors::ReviewError;
pub use list_reviews::{ProductReview, my_review, my_review_endpoint, reviews, reviews_endpoint};
pub use model::{RatingSummary, Review};
pub(crate) use model::{REVIEW_COLUMNS, ReviewRow};
pub use post_review::{ReviewPayload, post_review, post_review_endpoint};
