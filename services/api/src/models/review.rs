//! Provider reviews and rating aggregates

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;

/// Review entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub job_id: Uuid,
    pub provider_id: Uuid,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Request for reviewing a completed job
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitReviewRequest {
    pub job_id: Uuid,
    pub rating: f64,
    pub comment: Option<String>,
}

/// Running rating aggregate for one provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderRating {
    pub provider_id: Uuid,
    pub average_rating: Decimal,
    pub review_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitReviewResponse {
    pub review: Review,
    pub provider_rating: ProviderRating,
}

/// All reviews for a provider, newest first, with the aggregate
#[derive(Debug, Clone, Serialize)]
pub struct ProviderReviews {
    #[serde(flatten)]
    pub rating: ProviderRating,
    pub reviews: Vec<Review>,
}

/// Round a submitted rating to a whole star, rejecting anything outside 1..=5
pub fn validate_rating(rating: f64) -> Result<i16, String> {
    if !rating.is_finite() {
        return Err("Rating must be a number between 1 and 5".to_string());
    }
    let rounded = rating.round();
    if rounded < f64::from(MIN_RATING) || rounded > f64::from(MAX_RATING) {
        return Err("Rating must be between 1 and 5".to_string());
    }
    Ok(rounded as i16)
}

/// Mean rating rounded to two decimals; zero when there are no ratings
pub fn average_rating(ratings: &[i16]) -> Decimal {
    if ratings.is_empty() {
        return Decimal::ZERO;
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    (Decimal::from(sum) / Decimal::from(ratings.len() as i64))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl ProviderReviews {
    pub fn new(provider_id: Uuid, reviews: Vec<Review>) -> Self {
        let ratings: Vec<i16> = reviews.iter().map(|r| r.rating).collect();
        Self {
            rating: ProviderRating {
                provider_id,
                average_rating: average_rating(&ratings),
                review_count: reviews.len() as i64,
            },
            reviews,
        }
    }
}
